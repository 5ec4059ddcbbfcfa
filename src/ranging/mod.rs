mod sensor;

pub use sensor::{RangeSensor, RangingSample};
