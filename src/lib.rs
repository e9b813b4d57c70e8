pub mod cli;
pub mod controller;
pub mod modules;
pub mod telemetry;
pub mod utils;
pub mod zabbix;
