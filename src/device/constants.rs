//! RTL2832U register map and the USB ids of receivers built on it.
use std::time::Duration;

pub struct UsbDeviceSignature {
    pub vid: u16,
    pub pid: u16,
    pub description: &'static str,
}

const fn usb(vid: u16, pid: u16, description: &'static str) -> UsbDeviceSignature {
    UsbDeviceSignature {
        vid,
        pid,
        description,
    }
}

pub const KNOWN_DEVICES: [UsbDeviceSignature; 42] = [
    usb(0x0bda, 0x2832, "Generic RTL2832U"),
    usb(0x0bda, 0x2838, "Generic RTL2832U OEM"),
    usb(0x0413, 0x6680, "DigitalNow Quad DVB-T PCI-E card"),
    usb(0x0413, 0x6f0f, "Leadtek WinFast DTV Dongle mini D"),
    usb(0x0458, 0x707f, "Genius TVGo DVB-T03 USB dongle (Ver. B)"),
    usb(0x0ccd, 0x00a9, "Terratec Cinergy T Stick Black (rev 1)"),
    usb(0x0ccd, 0x00b3, "Terratec NOXON DAB/DAB+ USB dongle (rev 1)"),
    usb(0x0ccd, 0x00b4, "Terratec Deutschlandradio DAB Stick"),
    usb(0x0ccd, 0x00b5, "Terratec NOXON DAB Stick - Radio Energy"),
    usb(0x0ccd, 0x00b7, "Terratec Media Broadcast DAB Stick"),
    usb(0x0ccd, 0x00b8, "Terratec BR DAB Stick"),
    usb(0x0ccd, 0x00b9, "Terratec WDR DAB Stick"),
    usb(0x0ccd, 0x00c0, "Terratec MuellerVerlag DAB Stick"),
    usb(0x0ccd, 0x00c6, "Terratec Fraunhofer DAB Stick"),
    usb(0x0ccd, 0x00d3, "Terratec Cinergy T Stick RC (Rev.3)"),
    usb(0x0ccd, 0x00d7, "Terratec T Stick PLUS"),
    usb(0x0ccd, 0x00e0, "Terratec NOXON DAB/DAB+ USB dongle (rev 2)"),
    usb(0x1554, 0x5020, "PixelView PV-DT235U(RN)"),
    usb(0x15f4, 0x0131, "Astrometa DVB-T/DVB-T2"),
    usb(0x15f4, 0x0133, "HanfTek DAB+FM+DVB-T"),
    usb(0x185b, 0x0620, "Compro Videomate U620F"),
    usb(0x185b, 0x0650, "Compro Videomate U650F"),
    usb(0x185b, 0x0680, "Compro Videomate U680F"),
    usb(0x1b80, 0xd393, "GIGABYTE GT-U7300"),
    usb(0x1b80, 0xd394, "DIKOM USB-DVBT HD"),
    usb(0x1b80, 0xd395, "Peak 102569AGPK"),
    usb(0x1b80, 0xd397, "KWorld KW-UB450-T USB DVB-T Pico TV"),
    usb(0x1b80, 0xd398, "Zaapa ZT-MINDVBZP"),
    usb(0x1b80, 0xd39d, "SVEON STV20 DVB-T USB & FM"),
    usb(0x1b80, 0xd3a4, "Twintech UT-40"),
    usb(0x1b80, 0xd3a8, "ASUS U3100MINI_PLUS_V2"),
    usb(0x1b80, 0xd3af, "SVEON STV27 DVB-T USB & FM"),
    usb(0x1b80, 0xd3b0, "SVEON STV21 DVB-T USB & FM"),
    usb(0x1d19, 0x1101, "Dexatek DK DVB-T Dongle (Logilink VG0002A)"),
    usb(0x1d19, 0x1102, "Dexatek DK DVB-T Dongle (MSI DigiVox mini II V3.0)"),
    usb(0x1d19, 0x1103, "Dexatek Technology Ltd. DK 5217 DVB-T Dongle"),
    usb(0x1d19, 0x1104, "MSI DigiVox Micro HD"),
    usb(0x1f4d, 0xa803, "Sweex DVB-T USB"),
    usb(0x1f4d, 0xb803, "GTek T803"),
    usb(0x1f4d, 0xc803, "Lifeview LV5TDeluxe"),
    usb(0x1f4d, 0xd286, "MyGica TD312"),
    usb(0x1f4d, 0xd803, "PROlectrix DV107669"),
];

// Blocks
pub const BLOCK_USB: u16 = 1;
pub const BLOCK_SYS: u16 = 2;
pub const BLOCK_IIC: u16 = 6;

// Sys registers
pub const DEMOD_CTL: u16 = 0x3000;
pub const GPO: u16 = 0x3001;
pub const GPOE: u16 = 0x3003;
pub const GPD: u16 = 0x3004;
pub const DEMOD_CTL_1: u16 = 0x300b;

// USB registers
pub const USB_SYSCTL: u16 = 0x2000;
pub const USB_EPA_CTL: u16 = 0x2148;
pub const USB_EPA_MAXPKT: u16 = 0x2158;

pub const CTRL_IN: u8 =
    rusb::constants::LIBUSB_ENDPOINT_IN | rusb::constants::LIBUSB_REQUEST_TYPE_VENDOR;
pub const CTRL_OUT: u8 =
    rusb::constants::LIBUSB_ENDPOINT_OUT | rusb::constants::LIBUSB_REQUEST_TYPE_VENDOR;
pub const CTRL_TIMEOUT: Duration = Duration::from_millis(300);
