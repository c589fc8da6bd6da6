//! Per-species report of a fit.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::expander::ParameterExpander;
use crate::model::ModelFit;
use crate::parameters::Parameters;

/// Fitted values of one component, with standard errors where available.
///
/// Tied or fixed parameters carry no error of their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentFit {
    pub v_rad: f64,
    pub v_rad_err: Option<f64>,
    pub b: f64,
    pub b_err: Option<f64>,
    #[serde(rename = "N")]
    pub n: f64,
    #[serde(rename = "N_err")]
    pub n_err: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesFit {
    pub name: String,
    pub components: Vec<ComponentFit>,
}

/// A finished fit: statistics and parameters, plus the fitted components
/// grouped by species.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub fit: ModelFit,
    pub species: Vec<SpeciesFit>,
}

impl FitResult {
    pub(crate) fn new(fit: ModelFit, expander: &ParameterExpander) -> Result<Self> {
        let absorbers = expander.resolve(&fit.params)?;
        let stderr = |slot: Option<usize>| slot.and_then(|i| fit.params.get_at(i)).and_then(|p| p.stderr());

        let species = absorbers
            .species
            .iter()
            .enumerate()
            .map(|(s, species)| SpeciesFit {
                name: species.name.clone(),
                components: species
                    .components
                    .iter()
                    .enumerate()
                    .map(|(k, component)| ComponentFit {
                        v_rad: absorbers.groups[component.group].velocity,
                        v_rad_err: stderr(expander.velocity_slot(component.group)),
                        b: component.b,
                        b_err: stderr(expander.doppler_slot(s, k)),
                        n: component.n,
                        n_err: stderr(expander.column_slot(s, k)),
                    })
                    .collect(),
            })
            .collect();

        Ok(Self { fit, species })
    }

    pub fn success(&self) -> bool {
        self.fit.success
    }

    pub fn params(&self) -> &Parameters {
        &self.fit.params
    }

    /// Number of components per species.
    pub fn component_count(&self) -> usize {
        self.species.first().map_or(0, |s| s.components.len())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn format_err(err: Option<f64>) -> String {
    err.map_or_else(|| "n/a".to_string(), |e| format!("{:.2e}", e))
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fit)?;
        for species in &self.species {
            writeln!(f, "{}:", species.name)?;
            for (k, c) in species.components.iter().enumerate() {
                writeln!(
                    f,
                    "  [{}] v = {:8.3} ± {} km/s  b = {:6.3} ± {} km/s  N = {:.3e} ± {} cm^-2",
                    k,
                    c.v_rad,
                    format_err(c.v_rad_err),
                    c.b,
                    format_err(c.b_err),
                    c.n,
                    format_err(c.n_err)
                )?;
            }
        }
        Ok(())
    }
}
