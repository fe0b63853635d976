//! # CLI Module
//!
//! Command-line entry points for running and inspecting the pre-router.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! ```bash
//! specroute serve --config router.yaml --addr 0.0.0.0:8080 --watch
//! ```
//!
//! Runs the HTTP front end until SIGINT/SIGTERM. `--watch` invalidates an API
//! version as soon as a file under its specification directory changes.
//!
//! ### `classify`
//!
//! ```bash
//! specroute classify --config router.yaml http://localhost:8080/api/pets/v1/pets
//! # api api_name=pets version=v1
//! ```
//!
//! ### `routes`
//!
//! ```bash
//! specroute routes --config router.yaml --api pets --version v1
//! # GET /api/pets/v1/pets -> Handlers::Pets::getPets
//! ```
//!
//! The configuration file path may also come from `SPECROUTE_CONFIG`.

mod commands;


pub use commands::{execute, run_cli, Cli, Commands};
