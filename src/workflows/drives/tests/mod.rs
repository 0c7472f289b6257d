mod common;
mod roster;
mod service;
