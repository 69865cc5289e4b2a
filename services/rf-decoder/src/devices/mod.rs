//! Device decoders, one module per protocol family

pub mod auriol_afw2a1;
pub mod calibeur;
pub mod geo_minim;
pub mod holman_ws5029;
pub mod honeywell_cm921;
pub mod ht680;
pub mod infactory;
pub mod oregon_scientific;
pub mod schou_72543_rain;
pub mod tpms_abarth;
pub mod universal_fan;
pub mod x10_rf;
pub mod x10_sec;
