//! 33-entry NTC ADC-to-temperature lookup table with linear interpolation.
//!
//! A table of `(adc, temp * 10)` pairs, ADC ascending and temperature
//! descending, with the in-table lookup linearly interpolated and
//! out-of-table ADC values clamped to the nearest endpoint temperature.
//! `SteinhartHart` (see `thermistor.rs`) remains available as an alternate
//! model for boards that calibrate a thermistor directly instead of using
//! this fixed table.

/// One `(adc, temp_tenths_celsius)` entry. Kept in tenths of a degree to
/// use an integer table and avoid floating point literals in the table
/// itself.
pub type NtcEntry = (i32, i32);

/// The 100K/Beta=3950 NTC table, highest temperature (lowest ADC) first.
pub const DEFAULT_NTC_TABLE: [NtcEntry; 33] = [
    (23, 3000),
    (31, 2900),
    (41, 2800),
    (54, 2700),
    (71, 2600),
    (93, 2500),
    (120, 2400),
    (154, 2300),
    (196, 2200),
    (248, 2100),
    (311, 2000),
    (386, 1900),
    (475, 1800),
    (578, 1700),
    (696, 1600),
    (829, 1500),
    (976, 1400),
    (1136, 1300),
    (1307, 1200),
    (1486, 1100),
    (1670, 1000),
    (1855, 900),
    (2037, 800),
    (2213, 700),
    (2379, 600),
    (2534, 500),
    (2676, 400),
    (2804, 300),
    (2918, 200),
    (3018, 100),
    (3105, 0),
    (3180, -100),
    (3244, -200),
];

/// Highest valid ADC reading for a 12-bit ADC.
pub const ADC_MAX_VALUE: i32 = 4095;

/// Piecewise-linear ADC-to-temperature converter over a monotonic table.
#[derive(Debug, Clone, Copy)]
pub struct NtcLookupTable {
    table: &'static [NtcEntry],
}

impl NtcLookupTable {
    /// Builds a converter over the given table, which must be sorted by ADC
    /// value ascending (and, conventionally, temperature descending).
    pub const fn new(table: &'static [NtcEntry]) -> Self {
        Self { table }
    }

    /// Converts an ADC reading (0..=4095) to a temperature in degrees
    /// Celsius. Returns `None` for a negative or out-of-range ADC reading;
    /// in-range readings outside the table's own span clamp to the nearest
    /// endpoint's temperature rather than extrapolating.
    pub fn adc_to_celsius(&self, adc: i32) -> Option<f64> {
        if adc < 0 || adc > ADC_MAX_VALUE {
            return None;
        }

        let (first_adc, first_temp) = self.table[0];
        if adc <= first_adc {
            return Some(first_temp as f64 / 10.0);
        }
        let (last_adc, last_temp) = self.table[self.table.len() - 1];
        if adc >= last_adc {
            return Some(last_temp as f64 / 10.0);
        }

        for pair in self.table.windows(2) {
            let (adc_low, temp_low) = pair[0];
            let (adc_high, temp_high) = pair[1];
            if adc >= adc_low && adc <= adc_high {
                let ratio = (adc - adc_low) as f64 / (adc_high - adc_low) as f64;
                let temp = temp_low as f64 + ratio * (temp_high - temp_low) as f64;
                return Some(temp / 10.0);
            }
        }
        // Table is exhaustive between its endpoints given the early-return
        // clamps above, so this is unreachable for a well-formed table.
        None
    }
}

impl Default for NtcLookupTable {
    fn default() -> Self {
        Self::new(&DEFAULT_NTC_TABLE)
    }
}
