//! Integration tests for fitting

// The optimizer on plain least-squares problems
mod lm_tests;

// Species input to parameters and line lists
mod expander_tests;

// Fits at a fixed number of components
mod fit_tests;

// Choosing the number of components
mod selector_tests;
