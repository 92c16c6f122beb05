pub const KWH_PER_GWH: f64 = 1_000_000.;

/// Default building lifetime in years over which s-curves are laid out.
pub const DEFAULT_LIFETIME_YEARS: u32 = 130;

/// Decimal places at which condition and heating-system shares must close at 1.0.
pub const SHARE_CLOSURE_DECIMALS: i32 = 5;

/// Year from which yearly efficiency improvements apply when a row gives no start year.
pub const DEFAULT_YEARLY_IMPROVEMENT_START_YEAR: u32 = 2020;

/// Earliest and latest permitted building code birth years.
pub const BUILDING_CODE_YEAR_RANGE: (u32, u32) = (1940, 2070);

pub const DEFAULT_FLOOR_AREA_NEW_HOUSE: f64 = 175.;
pub const DEFAULT_FLOOR_AREA_NEW_APARTMENT_BLOCK: f64 = 75.;

pub fn kwh_to_gwh(kwh: f64) -> f64 {
    kwh / KWH_PER_GWH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_kwh_to_gwh() {
        assert_eq!(kwh_to_gwh(2_500_000.), 2.5);
    }
}
