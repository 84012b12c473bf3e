pub mod config;
pub mod display;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod weather;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
