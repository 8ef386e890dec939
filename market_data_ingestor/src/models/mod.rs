pub mod adjustment;
pub mod bar;
pub mod bar_series;
pub mod instrument;
pub mod period;
pub mod request_params;
