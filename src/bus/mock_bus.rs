//! Mock version of the demodulator's tuner bus services
use crate::bus::I2cBus;
use crate::error::Result;
use mockall::mock;

mock! {
    pub Bus {}
    impl I2cBus for Bus {
        fn i2c_write(&self, addr: u8, buf: &[u8]) -> Result<usize>;
        fn i2c_read(&self, addr: u8, buf: &mut [u8]) -> Result<usize>;
        fn set_i2c_repeater(&self, enable: bool) -> Result<()>;
        fn set_gpio_output(&self, gpio: u8) -> Result<()>;
        fn set_gpio_bit(&self, gpio: u8, on: bool) -> Result<()>;
    }
}
