//! Integration tests for the synthesis engine

// Properties every synthesized spectrum must have
mod properties;

// The λ4232 blend from start to finish
mod end_to_end;
