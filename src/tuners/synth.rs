//! Frequency synthesis planning.
//!
//! Each planner is a pure function of the requested frequency and the
//! reference crystal. It picks the chip's divider band, computes the integer
//! and fractional PLL words and reports the frequency those words actually
//! produce. Nothing here touches the bus, so every range failure surfaces
//! before a driver starts programming registers.
use crate::error::{Quantity, RangeError, Result};

pub const KHZ: u32 = 1_000;
pub const MHZ: u32 = 1_000_000;

/// Round-half-up conversion from Hz to kHz.
pub const fn round_khz(hz: u32) -> u32 {
    ((hz as u64 + 500) / 1000) as u32
}

fn out_of_range(hz: u32) -> crate::error::TunerError {
    RangeError::new(Quantity::Frequency, hz).into()
}

// ---------------------------------------------------------------------------
// FC0012 / FC0013: VCO = 2 * (xtal/2) * (xdiv + xin/32768), 15 bit fraction
// ---------------------------------------------------------------------------

/// One row of an FC001x divider table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcDivider {
    pub multi: u8,
    pub reg5: u8,
    pub reg6: u8,
}

const fn fc(multi: u8, reg5: u8, reg6: u8) -> FcDivider {
    FcDivider { multi, reg5, reg6 }
}

/// VCO ceiling in kHz for the divider walk.
pub const FC_VCO_CEILING_KHZ: u64 = 3_560_000;
/// FC0013 allows the divide-by-4 band up to this VCO frequency.
pub const FC0013_DIV4_CEILING_KHZ: u64 = 3_800_000;

pub const FC0012_DIVIDERS: [FcDivider; 10] = [
    fc(96, 0x82, 0x00),
    fc(64, 0x82, 0x02),
    fc(48, 0x42, 0x00),
    fc(32, 0x42, 0x02),
    fc(24, 0x22, 0x00),
    fc(16, 0x22, 0x02),
    fc(12, 0x12, 0x00),
    fc(8, 0x12, 0x02),
    fc(6, 0x0a, 0x00),
    fc(4, 0x0a, 0x02),
];

pub const FC0013_DIVIDERS: [FcDivider; 9] = [
    fc(96, 0x82, 0x00),
    fc(64, 0x02, 0x02),
    fc(48, 0x42, 0x00),
    fc(32, 0x82, 0x02),
    fc(24, 0x22, 0x00),
    fc(16, 0x42, 0x02),
    fc(12, 0x12, 0x00),
    fc(8, 0x22, 0x02),
    fc(6, 0x0a, 0x00),
];
const FC0013_DIV4: FcDivider = fc(4, 0x12, 0x02);
const FC0013_DIV4_HALVED: FcDivider = fc(4, 0x0a, 0x02);

/// Register words for an FC0012/FC0013 tune.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcPlan {
    pub requested_khz: u32,
    pub xtal_khz: u32,
    pub divider: FcDivider,
    /// The frequency was halved before multiplying (FC0013 above 950 MHz).
    pub halved: bool,
    pub xdiv: u16,
    pub xin: u16,
    /// Values for registers 0x01..=0x06, before bandwidth bits.
    pub regs: [u8; 6],
    pub actual_hz: u32,
}

impl FcPlan {
    /// Integer divider as the chip sees it: 8 * reg2 + reg1.
    pub fn programmed_xdiv(&self) -> u32 {
        8 * self.regs[1] as u32 + self.regs[0] as u32
    }
}

/// First-match walk of the FC0012 divider table.
pub fn fc0012_divider(freq_khz: u32) -> FcDivider {
    let last = FC0012_DIVIDERS[FC0012_DIVIDERS.len() - 1];
    FC0012_DIVIDERS
        .iter()
        .copied()
        .find(|d| freq_khz as u64 * (d.multi as u64) < FC_VCO_CEILING_KHZ)
        .unwrap_or(last)
}

pub fn fc0012_plan(freq_hz: u32, xtal_hz: u32) -> Result<FcPlan> {
    let freq_khz = freq_hz / KHZ;
    fc_plan(freq_hz, freq_khz, xtal_hz, fc0012_divider(freq_khz), false)
}

/// First-match walk of the FC0013 divider table, returning whether the
/// frequency has to be halved first.
pub fn fc0013_divider(freq_khz: u32) -> (FcDivider, bool) {
    let f = freq_khz as u64;
    match FC0013_DIVIDERS
        .iter()
        .find(|d| f * (d.multi as u64) < FC_VCO_CEILING_KHZ)
    {
        Some(d) => (*d, false),
        None if f * 4 < FC0013_DIV4_CEILING_KHZ => (FC0013_DIV4, false),
        None => (FC0013_DIV4_HALVED, true),
    }
}

pub fn fc0013_plan(freq_hz: u32, xtal_hz: u32) -> Result<FcPlan> {
    let freq_khz = freq_hz / KHZ;
    let (divider, halved) = fc0013_divider(freq_khz);
    let vco_input = if halved { freq_khz / 2 } else { freq_khz };
    fc_plan(freq_hz, vco_input, xtal_hz, divider, halved)
}

fn fc_plan(
    freq_hz: u32,
    freq_khz: u32,
    xtal_hz: u32,
    divider: FcDivider,
    halved: bool,
) -> Result<FcPlan> {
    let xtal_khz = round_khz(xtal_hz);
    let half = xtal_khz / 2;
    if half == 0 {
        return Err(RangeError::new(Quantity::Crystal, xtal_hz).into());
    }
    let vco = freq_khz * divider.multi as u32;

    let whole = vco / half;
    let rem = vco - whole * half;
    let mut xdiv = whole;
    if rem >= xtal_khz / 4 {
        xdiv += 1;
    }

    let pm = xdiv / 8;
    let am = xdiv - 8 * pm;
    let (reg1, reg2) = if am < 2 {
        if pm == 0 {
            return Err(out_of_range(freq_hz));
        }
        (am + 8, pm - 1)
    } else {
        (am, pm)
    };
    if reg2 > u8::MAX as u32 {
        return Err(out_of_range(freq_hz));
    }

    // 15 bit fraction of the truncated remainder; past the midpoint the
    // chip expects the carry folded into bit 15.
    let mut xin = ((rem << 15) / half) as u16;
    if xin >= 16384 {
        xin = xin.wrapping_add(32768);
    }

    let regs = [
        reg1 as u8,
        reg2 as u8,
        (xin >> 8) as u8,
        (xin & 0xff) as u8,
        divider.reg5,
        divider.reg6 | 0x08,
    ];
    let mut plan = FcPlan {
        requested_khz: freq_hz / KHZ,
        xtal_khz,
        divider,
        halved,
        xdiv: xdiv as u16,
        xin,
        regs,
        actual_hz: 0,
    };
    plan.actual_hz = fc_reconstruct(&plan);
    Ok(plan)
}

/// Frequency produced by the programmed FC001x words.
pub fn fc_reconstruct(plan: &FcPlan) -> u32 {
    let half_hz = (plan.xtal_khz / 2) as i64 * KHZ as i64;
    let word = plan.programmed_xdiv() as i64 * 32768 + plan.xin as i16 as i64;
    let vco_hz = half_hz * word / 32768;
    let mut freq = vco_hz / plan.divider.multi as i64;
    if plan.halved {
        freq *= 2;
    }
    freq as u32
}

// ---------------------------------------------------------------------------
// E4000: VCO = ref * (Z + SigDel/65536), sigma-delta clamped
// ---------------------------------------------------------------------------

/// (upper frequency in kHz, band code, VCO multiplier)
pub const E4000_BANDS: [(u32, u8, u32); 10] = [
    (72_400, 15, 48),
    (81_200, 14, 40),
    (108_300, 13, 32),
    (162_500, 12, 24),
    (216_600, 11, 16),
    (325_000, 10, 12),
    (350_000, 9, 8),
    (432_000, 3, 8),
    (667_000, 2, 6),
    (1_200_000, 1, 4),
];
const E4000_TOP_BAND: (u8, u32) = (0, 2);

pub const E4000_SIGDEL_MIN: u32 = 1024;
pub const E4000_SIGDEL_MAX: u32 = 64512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct E4000Plan {
    pub freq_khz: u32,
    pub ref_khz: u32,
    pub band: u8,
    pub multiplier: u32,
    pub z: u8,
    pub sigma_delta: u16,
    pub actual_hz: u32,
}

impl E4000Plan {
    /// Payload for registers 0x09..=0x0d.
    pub fn synth_regs(&self) -> [u8; 5] {
        [
            self.z,
            (self.sigma_delta & 0xff) as u8,
            (self.sigma_delta >> 8) as u8,
            0,
            self.band,
        ]
    }
}

pub fn e4000_band(freq_khz: u32) -> (u8, u32) {
    E4000_BANDS
        .iter()
        .find(|(limit, _, _)| freq_khz <= *limit)
        .map(|&(_, band, mult)| (band, mult))
        .unwrap_or(E4000_TOP_BAND)
}

pub fn e4000_plan(freq_hz: u32, xtal_hz: u32) -> Result<E4000Plan> {
    let freq_khz = round_khz(freq_hz);
    let ref_khz = round_khz(xtal_hz);
    if ref_khz == 0 {
        return Err(RangeError::new(Quantity::Crystal, xtal_hz).into());
    }
    let (band, multiplier) = e4000_band(freq_khz);
    let vco = freq_khz as u64 * multiplier as u64;
    let z = vco / ref_khz as u64;
    if z > u8::MAX as u64 {
        return Err(out_of_range(freq_hz));
    }
    let sigma_delta = (65536 * (vco - z * ref_khz as u64) / ref_khz as u64)
        .clamp(E4000_SIGDEL_MIN as u64, E4000_SIGDEL_MAX as u64);
    let mut plan = E4000Plan {
        freq_khz,
        ref_khz,
        band,
        multiplier,
        z: z as u8,
        sigma_delta: sigma_delta as u16,
        actual_hz: 0,
    };
    plan.actual_hz = e4000_reconstruct(&plan);
    Ok(plan)
}

pub fn e4000_reconstruct(plan: &E4000Plan) -> u32 {
    let ref_hz = plan.ref_khz as u64 * KHZ as u64;
    let vco_hz = ref_hz * plan.z as u64 + ref_hz * plan.sigma_delta as u64 / 65536;
    (vco_hz / plan.multiplier as u64) as u32
}

// ---------------------------------------------------------------------------
// E4K: Fvco = Fosc * (Z + X/65536), Flo = Fvco / R
// ---------------------------------------------------------------------------

pub const E4K_PLL_Y: u64 = 65536;
pub const E4K_FVCO_MIN_KHZ: u64 = 2_600_000;
pub const E4K_FVCO_MAX_KHZ: u64 = 3_900_000;
pub const E4K_FOSC_MIN: u32 = 16 * MHZ;
pub const E4K_FOSC_MAX: u32 = 30 * MHZ;
pub const E4K_FLO_MIN: u32 = 50 * MHZ;
pub const E4K_FLO_MAX: u32 = 1900 * MHZ;
/// R dividers with three phase mixing; halved otherwise.
pub const E4K_R_3PH: [u8; 8] = [4, 8, 12, 16, 24, 32, 40, 48];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct E4kPlan {
    pub fosc: u32,
    pub intended_flo: u32,
    pub flo: u32,
    pub r: u8,
    pub r_idx: u8,
    pub three_phase: bool,
    pub z: u8,
    pub x: u16,
}

impl E4kPlan {
    /// SYNTH7 value: R index and mixing mode.
    pub fn synth7(&self) -> u8 {
        (self.r_idx & 0x7) | ((self.three_phase as u8) << 3)
    }
}

fn e4k_fvco_valid(fvco: u64) -> bool {
    (E4K_FVCO_MIN_KHZ..=E4K_FVCO_MAX_KHZ).contains(&(fvco / 1000))
}

/// Fvco for the programmed words, `None` if the integer part is off band.
pub fn e4k_fvco(fosc: u32, z: u8, x: u16) -> Option<u32> {
    let fvco_z = fosc as u64 * z as u64;
    if !e4k_fvco_valid(fvco_z) {
        return None;
    }
    let fvco = fvco_z + fosc as u64 * x as u64 / E4K_PLL_Y;
    u32::try_from(fvco).ok()
}

pub fn e4k_reconstruct(fosc: u32, z: u8, x: u16, r: u8) -> Option<u32> {
    e4k_fvco(fosc, z, x).map(|fvco| fvco / r as u32)
}

pub fn e4k_plan(fosc: u32, flo: u32) -> Result<E4kPlan> {
    if !(E4K_FOSC_MIN..=E4K_FOSC_MAX).contains(&fosc) {
        return Err(RangeError::new(Quantity::Crystal, fosc).into());
    }
    if !(E4K_FLO_MIN..=E4K_FLO_MAX).contains(&flo) {
        return Err(out_of_range(flo));
    }
    let three_phase = flo < 300 * MHZ;

    for (i, r3) in E4K_R_3PH.iter().enumerate() {
        let r = if three_phase { *r3 } else { r3 / 2 };
        let fvco = flo as u64 * r as u64;
        if fvco > u32::MAX as u64 || !e4k_fvco_valid(fvco) {
            continue;
        }
        let z = fvco / fosc as u64;
        if z > u8::MAX as u64 {
            continue;
        }
        let remainder = fvco - fosc as u64 * z;
        let x = remainder * E4K_PLL_Y / fosc as u64;
        let (z, x) = (z as u8, x as u16);
        let actual = match e4k_reconstruct(fosc, z, x, r) {
            Some(actual) => actual,
            None => continue,
        };
        return Ok(E4kPlan {
            fosc,
            intended_flo: flo,
            flo: actual,
            r,
            r_idx: i as u8,
            three_phase,
            z,
            x,
        });
    }
    Err(out_of_range(flo))
}

// ---------------------------------------------------------------------------
// R820T: VCO = 2 * ref * (Nint + SDM/65536), LO = VCO / mix_div
// ---------------------------------------------------------------------------

pub const R82XX_VCO_MIN_KHZ: u64 = 1_770_000;
pub const R82XX_VCO_MAX_KHZ: u64 = R82XX_VCO_MIN_KHZ * 2;
pub const R82XX_VCO_POWER_REF: u8 = 2;
const R82XX_MAX_NINT: u64 = 128 / R82XX_VCO_POWER_REF as u64 - 1;
const R82XX_MIN_NINT: u64 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct R82xxPlan {
    pub lo_hz: u32,
    pub pll_ref: u32,
    pub mix_div: u8,
    /// Divider select before the VCO fine tune correction.
    pub div_num: u8,
    pub nint: u8,
    /// Fractional part left after the integer divider, in kHz.
    pub vco_fra: u32,
    pub sdm: u16,
    pub actual_hz: u32,
}

impl R82xxPlan {
    /// Register 0x14 value: Ni in bits 5..0, Si in bits 7..6.
    pub fn ni_si(&self) -> u8 {
        let ni = (self.nint - 13) / 4;
        let si = self.nint - 4 * ni - 13;
        ni + (si << 6)
    }
}

pub fn r82xx_plan(lo_hz: u32, pll_ref: u32) -> Result<R82xxPlan> {
    let freq_khz = round_khz(lo_hz) as u64;
    let pll_ref_khz = round_khz(pll_ref) as u64;
    if pll_ref == 0 {
        return Err(RangeError::new(Quantity::Crystal, pll_ref).into());
    }

    let mut mix_div = 2_u64;
    let mut div_num = 0_u8;
    loop {
        if mix_div > 64 {
            return Err(out_of_range(lo_hz));
        }
        let vco = freq_khz * mix_div;
        if vco >= R82XX_VCO_MIN_KHZ && vco < R82XX_VCO_MAX_KHZ {
            let mut div_buf = mix_div;
            while div_buf > 2 {
                div_buf >>= 1;
                div_num += 1;
            }
            break;
        }
        mix_div <<= 1;
    }

    let vco_freq = lo_hz as u64 * mix_div;
    let nint = vco_freq / (2 * pll_ref as u64);
    if !(R82XX_MIN_NINT..=R82XX_MAX_NINT).contains(&nint) {
        return Err(out_of_range(lo_hz));
    }
    let mut vco_fra = ((vco_freq - 2 * pll_ref as u64 * nint) / 1000) as u32;
    let vco_fra_initial = vco_fra;

    let mut n_sdm = 2_u64;
    let mut sdm = 0_u64;
    while vco_fra > 1 {
        let step = 2 * pll_ref_khz / n_sdm;
        if vco_fra as u64 > step {
            sdm += 32768 / (n_sdm / 2);
            vco_fra -= step as u32;
            if n_sdm >= 0x8000 {
                break;
            }
        }
        n_sdm <<= 1;
    }

    let mut plan = R82xxPlan {
        lo_hz,
        pll_ref,
        mix_div: mix_div as u8,
        div_num,
        nint: nint as u8,
        vco_fra: vco_fra_initial,
        sdm: sdm as u16,
        actual_hz: 0,
    };
    plan.actual_hz = r82xx_reconstruct(&plan);
    Ok(plan)
}

pub fn r82xx_reconstruct(plan: &R82xxPlan) -> u32 {
    let two_ref = 2 * plan.pll_ref as u64;
    let vco = two_ref * plan.nint as u64 + two_ref * plan.sdm as u64 / 65536;
    (vco / plan.mix_div as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TunerError;

    const XTAL: u32 = 28_800_000;

    fn is_range_error<T: std::fmt::Debug>(result: Result<T>) -> bool {
        matches!(result, Err(TunerError::Range(_)))
    }

    #[test]
    fn test_fc0012_divider_first_match_on_boundary() {
        // 3560000 / 96 = 37083.33: 37083 still fits under the ceiling
        assert_eq!(fc0012_divider(37_083).multi, 96);
        assert_eq!(fc0012_divider(37_084).multi, 64);
        // 3560000 / 64 = 55625 exactly: the strict comparison moves it on
        assert_eq!(fc0012_divider(55_624).multi, 64);
        assert_eq!(fc0012_divider(55_625).multi, 48);
        assert_eq!(fc0012_divider(2_000_000).multi, 4);
    }

    #[test]
    fn test_fc0013_halves_above_div4_ceiling() {
        assert_eq!(fc0013_divider(949_999), (FC0013_DIV4, false));
        assert_eq!(fc0013_divider(950_000), (FC0013_DIV4_HALVED, true));
        // 3560000 / 6 = 593333.33
        assert_eq!(fc0013_divider(593_333).0.multi, 6);
        assert_eq!(fc0013_divider(593_334), (FC0013_DIV4, false));
    }

    #[test]
    fn test_fc0012_plan_registers() {
        // 100 MHz: multi 32, vco 3200000 kHz, half xtal 14400
        let plan = fc0012_plan(100_000_000, XTAL).unwrap();
        assert_eq!(plan.divider.multi, 32);
        // 3200000 / 14400 = 222 r 3200 -> no round up
        assert_eq!(plan.xdiv, 222);
        assert_eq!(plan.regs[0], 222 - 8 * 27);
        assert_eq!(plan.regs[1], 27);
        // xin = (3200 << 15) / 14400 = 7281
        assert_eq!(plan.xin, 7281);
        assert_eq!(plan.regs[2], (7281 >> 8) as u8);
        assert_eq!(plan.regs[3], (7281 & 0xff) as u8);
        assert_eq!(plan.regs[4], 0x42);
        assert_eq!(plan.regs[5], 0x02 | 0x08);
    }

    #[test]
    fn test_fc_round_up_carries_into_xin() {
        // 52.1 MHz: multi 64, vco 3334400, 231 * 14400 = 3326400, rem 8000
        let plan = fc0012_plan(52_100_000, XTAL).unwrap();
        assert_eq!(plan.divider.multi, 64);
        assert_eq!(plan.xdiv, 232);
        let raw = ((8000_u32 << 15) / 14400) as u16;
        assert!(raw >= 16384);
        assert_eq!(plan.xin, raw.wrapping_add(32768));
        // The carry makes xin negative relative to the rounded divider
        let vco = 14_400_000_i64 * (232 * 32768 + plan.xin as i16 as i64) / 32768;
        assert_eq!(plan.actual_hz as i64, vco / 64);
    }

    #[test]
    fn test_fc_am_below_two_borrows_from_pm() {
        // Find a divider with am == 0: xdiv = 224 -> pm 28, am 0
        // vco = 224 * 14400 = 3225600 -> 100.8 MHz at multi 32
        let plan = fc0012_plan(100_800_000, XTAL).unwrap();
        assert_eq!(plan.xdiv, 224);
        assert_eq!(plan.regs[0], 8);
        assert_eq!(plan.regs[1], 27);
        assert_eq!(plan.programmed_xdiv(), 224);
    }

    #[test]
    fn test_fc_plan_round_trip() {
        for plan_fn in [fc0012_plan, fc0013_plan] {
            let mut freq = 22_000_000;
            while freq < 1_700_000_000 {
                let plan = plan_fn(freq, XTAL).unwrap();
                assert_eq!(fc_reconstruct(&plan), plan.actual_hz);
                let requested = plan.requested_khz as i64 * 1000;
                // One step of the 15 bit accumulator at the VCO, divided
                // down, plus the kHz truncation of the halved path.
                let quantum = 14_400_000 / 32768 / plan.divider.multi as i64 + 3;
                let slack = if plan.halved { 2 * quantum + 2000 } else { quantum };
                assert!(
                    (plan.actual_hz as i64 - requested).abs() <= slack,
                    "{} Hz -> {} Hz",
                    freq,
                    plan.actual_hz
                );
                freq += 7_654_321;
            }
        }
    }

    #[test]
    fn test_fc_plan_rejects_underflowing_divider() {
        assert!(is_range_error(fc0012_plan(1_000, XTAL)));
        assert!(is_range_error(fc0012_plan(100_000_000, 0)));
    }

    #[test]
    fn test_e4000_band_first_match() {
        assert_eq!(e4000_band(72_400), (15, 48));
        assert_eq!(e4000_band(72_401), (14, 40));
        assert_eq!(e4000_band(350_000), (9, 8));
        assert_eq!(e4000_band(350_001), (3, 8));
        assert_eq!(e4000_band(1_200_000), (1, 4));
        assert_eq!(e4000_band(1_200_001), (0, 2));
    }

    #[test]
    fn test_e4000_plan_registers() {
        // 100 MHz: band 13, x32, vco 3200000 kHz, z 111 r 3200
        let plan = e4000_plan(100_000_000, XTAL).unwrap();
        assert_eq!(plan.band, 13);
        assert_eq!(plan.z, 111);
        assert_eq!(plan.sigma_delta, (65536 * 3200 / 28800) as u16);
        let regs = plan.synth_regs();
        assert_eq!(regs[0], 111);
        assert_eq!(regs[1], (plan.sigma_delta & 0xff) as u8);
        assert_eq!(regs[2], (plan.sigma_delta >> 8) as u8);
        assert_eq!(regs[3], 0);
        assert_eq!(regs[4], 13);
    }

    #[test]
    fn test_e4000_sigma_delta_clamped() {
        // 28.8 MHz * 111 / 32 = 99.9 MHz lands on an integer divider
        let plan = e4000_plan(99_900_000, XTAL).unwrap();
        assert_eq!(plan.sigma_delta as u32, E4000_SIGDEL_MIN);
        assert_eq!(e4000_reconstruct(&plan), plan.actual_hz);
    }

    #[test]
    fn test_e4000_plan_round_trip() {
        let mut freq = 52_000_000;
        while freq < 2_200_000_000 {
            let plan = e4000_plan(freq, XTAL).unwrap();
            assert_eq!(e4000_reconstruct(&plan), plan.actual_hz);
            let quantum = 28_800_000 / 65536 / plan.multiplier as i64 + 3;
            // Clamping the accumulator costs up to 1024 steps
            let clamp = 1024 * 28_800_000 / 65536 / plan.multiplier as i64 + 3;
            let error = (plan.actual_hz as i64 - plan.freq_khz as i64 * 1000).abs();
            assert!(error <= quantum.max(clamp), "{} Hz -> {} Hz", freq, plan.actual_hz);
            let sd = plan.sigma_delta as u32;
            if sd > E4000_SIGDEL_MIN && sd < E4000_SIGDEL_MAX {
                assert!(error <= quantum, "{} Hz -> {} Hz", freq, plan.actual_hz);
            }
            freq += 3_333_333;
        }
    }

    #[test]
    fn test_e4k_plan_three_phase_below_300mhz() {
        let plan = e4k_plan(XTAL, 100_000_000).unwrap();
        assert!(plan.three_phase);
        // 100 MHz * 32 = 3.2 GHz is the first valid VCO
        assert_eq!(plan.r, 32);
        assert_eq!(plan.r_idx, 5);
        assert_eq!(plan.synth7(), 5 | 8);
        assert_eq!(plan.z, 111);

        let plan = e4k_plan(XTAL, 800_000_000).unwrap();
        assert!(!plan.three_phase);
        assert_eq!(plan.r, 4);
        assert_eq!(plan.synth7(), 1);
    }

    #[test]
    fn test_e4k_plan_limits() {
        assert!(is_range_error(e4k_plan(XTAL, 49_999_999)));
        assert!(is_range_error(e4k_plan(XTAL, 1_900_000_001)));
        assert!(is_range_error(e4k_plan(15_000_000, 100_000_000)));
        // No R divider places 1.1 GHz inside the VCO band
        assert!(is_range_error(e4k_plan(XTAL, 1_100_000_000)));
    }

    #[test]
    fn test_e4k_plan_round_trip() {
        let (mut planned, mut total) = (0, 0);
        let mut flo = 55_000_000;
        while flo <= E4K_FLO_MAX {
            total += 1;
            if let Ok(plan) = e4k_plan(XTAL, flo) {
                planned += 1;
                assert_eq!(
                    e4k_reconstruct(plan.fosc, plan.z, plan.x, plan.r),
                    Some(plan.flo)
                );
                let quantum = XTAL as i64 / 65536 + 1;
                assert!((plan.flo as i64 - flo as i64).abs() <= quantum);
            }
            flo += 4_321_987;
        }
        // Only the gap between the two-phase R=4 and R=2 bands is unreachable
        assert!(planned * 4 >= total * 3, "{} of {}", planned, total);
    }

    #[test]
    fn test_r82xx_plan_mix_div_walk() {
        // LO 103.57 MHz: 103570 * 32 = 3314240 kHz
        let plan = r82xx_plan(103_570_000, XTAL).unwrap();
        assert_eq!(plan.mix_div, 32);
        assert_eq!(plan.div_num, 4);
        // LO 1 GHz: x2 = 2 GHz
        let plan = r82xx_plan(1_000_000_000, XTAL).unwrap();
        assert_eq!(plan.mix_div, 2);
        assert_eq!(plan.div_num, 0);
    }

    #[test]
    fn test_r82xx_plan_nint() {
        let plan = r82xx_plan(100_000_000, XTAL).unwrap();
        // 100 MHz * 32 = 3.2 GHz, / 57.6 MHz = 55
        assert_eq!(plan.nint, 55);
        let ni = (55 - 13) / 4;
        assert_eq!(plan.ni_si(), ni + ((55 - 4 * ni - 13) << 6));
    }

    #[test]
    fn test_r82xx_plan_out_of_range() {
        assert!(is_range_error(r82xx_plan(20_000_000, XTAL)));
        assert!(is_range_error(r82xx_plan(1_800_000_000, XTAL)));
    }

    #[test]
    fn test_r82xx_plan_round_trip() {
        let mut lo = 28_000_000;
        while lo < 1_760_000_000 {
            let plan = r82xx_plan(lo, XTAL).unwrap();
            assert_eq!(r82xx_reconstruct(&plan), plan.actual_hz);
            // The fraction is resolved in kHz at the VCO
            assert!(
                (plan.actual_hz as i64 - lo as i64).abs() <= 10_000,
                "{} Hz -> {} Hz",
                lo,
                plan.actual_hz
            );
            lo += 9_876_543;
        }
    }
}
