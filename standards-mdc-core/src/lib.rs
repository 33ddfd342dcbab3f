#![doc = "standards-mdc-core: core pipeline for standards-mdc."]

//! This crate contains the whole fetch → extract → format → write pipeline
//! that turns a published coding-standards document into editor rule files.
//! The `standards-mdc` binary only adds configuration loading and the CLI.
//!
//! # Usage
//! Build a [`config::Config`], pick a [`contract::Fetcher`] (normally
//! [`download::HttpFetcher`]) and a [`contract::RuleSink`] (normally
//! [`writer::DirectoryWriter`]), then call [`synchronise::synchronise`].

pub mod config;
pub mod contract;
pub mod download;
pub mod extract;
pub mod format;
pub mod synchronise;
pub mod writer;
