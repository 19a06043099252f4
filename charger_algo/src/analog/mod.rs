pub mod accumulator;
pub mod acquisition;
pub mod charge;
pub mod composer;
pub mod delta;
pub mod readings;
