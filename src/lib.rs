// Layers, outermost first:
//
//   cli          (1) clap commands
//   application  (2) pack / inspect use cases
//   domain       (3) conversations, samples, windows, errors, traits
//   data         (4) packing pipeline
//   infra        (6) tokenizer loading, output files

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod infra;
