#![cfg(not(doctest))]

#[macro_use]
extern crate diesel;

pub mod db;
pub mod email;
pub mod milestone;
pub mod models;
pub mod money;
pub mod push;
pub mod realtime;
pub mod request_io;
pub mod schema;
pub mod threadrand;
pub mod token;
pub mod validators;
