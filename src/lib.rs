pub mod config;
pub mod domain;
pub mod ena;
pub mod error;
pub mod eutils;
pub mod explorer;
pub mod extract;
pub mod markup;
pub mod output;
pub mod remote;
pub mod table;
