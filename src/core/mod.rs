pub mod area_forecast;
pub mod building;
pub mod column_operations;
pub mod condition_shares;
pub mod construction;
pub mod energy_need;
pub mod energy_use;
pub mod heating_systems;
pub mod holiday_home;
pub mod s_curve;
pub mod units;
