#![allow(dead_code)]

pub mod data_generators;
pub mod http_server;
pub mod jsonl_builder;
pub mod npy_builder;
