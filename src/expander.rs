//! Mapping between the typed absorber hierarchy and a flat parameter set.
//!
//! Every velocity group owns one `v_rad_{g}` parameter; every component of
//! every species owns `b_{s}_{k}` and `N_{s}_{k}`. The expander records the
//! slot of each parameter when the set is built, so expanding a parameter
//! vector into a line list is a walk over index tables.

use crate::config::ComponentDefaults;
use crate::error::{Result, VoigtFitError};
use crate::parameters::{Parameter, Parameters};
use crate::species::{Absorbers, Cloud, Line, LineList};

/// Name of the shared velocity of group `g`.
pub fn velocity_name(g: usize) -> String {
    format!("v_rad_{}", g)
}

pub fn doppler_name(s: usize, k: usize) -> String {
    format!("b_{}_{}", s, k)
}

pub fn column_name(s: usize, k: usize) -> String {
    format!("N_{}_{}", s, k)
}

#[derive(Debug, Clone)]
pub struct ParameterExpander {
    layout: Absorbers,
    b_bounds: (f64, f64),
    /// group → slot of its velocity
    velocity_slots: Vec<usize>,
    /// [species][component] → slot of b
    doppler_slots: Vec<Vec<usize>>,
    /// [species][component] → slot of N
    column_slots: Vec<Vec<usize>>,
    parameter_count: usize,
}

impl ParameterExpander {
    /// Index the parameters of `absorbers`.
    ///
    /// Every species needs at least one transition and one component, and
    /// every component must belong to an existing group.
    pub fn new(absorbers: Absorbers, defaults: &ComponentDefaults) -> Result<Self> {
        defaults.validate()?;
        if absorbers.species.is_empty() {
            return Err(VoigtFitError::Configuration("no species to fit".to_string()));
        }

        for species in &absorbers.species {
            if species.transitions.is_empty() {
                return Err(VoigtFitError::Configuration(format!(
                    "species '{}' has no transitions",
                    species.name
                )));
            }
            if species.components.is_empty() {
                return Err(VoigtFitError::Configuration(format!(
                    "species '{}' has no components",
                    species.name
                )));
            }
            for transition in &species.transitions {
                transition.validate()?;
            }
            if let Some(c) = species.components.iter().find(|c| c.group >= absorbers.groups.len()) {
                return Err(VoigtFitError::Configuration(format!(
                    "species '{}' refers to missing velocity group {}",
                    species.name, c.group
                )));
            }
        }

        let velocity_slots: Vec<usize> = (0..absorbers.groups.len()).collect();
        let mut next = velocity_slots.len();
        let mut doppler_slots = Vec::with_capacity(absorbers.species.len());
        let mut column_slots = Vec::with_capacity(absorbers.species.len());
        for species in &absorbers.species {
            let mut b = Vec::with_capacity(species.components.len());
            let mut n = Vec::with_capacity(species.components.len());
            for _ in &species.components {
                b.push(next);
                n.push(next + 1);
                next += 2;
            }
            doppler_slots.push(b);
            column_slots.push(n);
        }

        Ok(Self {
            layout: absorbers,
            b_bounds: (defaults.b_min, defaults.b_max),
            velocity_slots,
            doppler_slots,
            column_slots,
            parameter_count: next,
        })
    }

    /// Absorbers the expander was built from, with their initial values.
    pub fn absorbers(&self) -> &Absorbers {
        &self.layout
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn velocity_slot(&self, g: usize) -> Option<usize> {
        self.velocity_slots.get(g).copied()
    }

    pub fn doppler_slot(&self, s: usize, k: usize) -> Option<usize> {
        self.doppler_slots.get(s)?.get(k).copied()
    }

    pub fn column_slot(&self, s: usize, k: usize) -> Option<usize> {
        self.column_slots.get(s)?.get(k).copied()
    }

    /// Build the parameter set in slot order, starting from the layout's values.
    ///
    /// Doppler widths are bounded to `[b_min, b_max]` with out-of-range
    /// starting values clamped; column densities are bounded below by zero.
    pub fn parameters(&self) -> Result<Parameters> {
        let (b_min, b_max) = self.b_bounds;
        let mut params = Parameters::new();

        for (g, group) in self.layout.groups.iter().enumerate() {
            params.add_param(&velocity_name(g), group.velocity)?;
        }
        for (s, species) in self.layout.species.iter().enumerate() {
            for (k, component) in species.components.iter().enumerate() {
                params.add_param_with_bounds(&doppler_name(s, k), component.b, b_min, b_max)?;
                params.add(Parameter::with_bounds(
                    &column_name(s, k),
                    component.n.max(0.0),
                    0.0,
                    f64::INFINITY,
                )?)?;
            }
        }

        debug_assert_eq!(params.len(), self.parameter_count);
        Ok(params)
    }

    /// Flat line list for the current parameter values.
    ///
    /// Walks species, then components, then transitions; each component's
    /// velocity is read from its group's single parameter.
    pub fn expand(&self, params: &Parameters) -> Result<LineList> {
        self.check_size(params)?;

        let capacity = self
            .layout
            .species
            .iter()
            .map(|sp| sp.transitions.len() * sp.components.len())
            .sum();
        let mut lines = LineList::with_capacity(capacity);

        for (s, species) in self.layout.species.iter().enumerate() {
            for k in 0..species.components.len() {
                let cloud = self.cloud_at(params, s, k)?;
                for &transition in &species.transitions {
                    lines.push(Line { transition, cloud });
                }
            }
        }
        Ok(lines)
    }

    /// Snapshot of the absorbers with the values held in `params`.
    pub fn resolve(&self, params: &Parameters) -> Result<Absorbers> {
        self.check_size(params)?;

        let mut absorbers = self.layout.clone();
        for (g, group) in absorbers.groups.iter_mut().enumerate() {
            group.velocity = params.value_at(self.velocity_slots[g])?;
        }
        for (s, species) in absorbers.species.iter_mut().enumerate() {
            for (k, component) in species.components.iter_mut().enumerate() {
                component.b = params.value_at(self.doppler_slots[s][k])?;
                component.n = params.value_at(self.column_slots[s][k])?;
            }
        }
        Ok(absorbers)
    }

    fn cloud_at(&self, params: &Parameters, s: usize, k: usize) -> Result<Cloud> {
        let group = self.layout.species[s].components[k].group;
        Ok(Cloud::new(
            params.value_at(self.velocity_slots[group])?,
            params.value_at(self.doppler_slots[s][k])?,
            params.value_at(self.column_slots[s][k])?,
        ))
    }

    fn check_size(&self, params: &Parameters) -> Result<()> {
        if params.len() != self.parameter_count {
            return Err(VoigtFitError::Configuration(format!(
                "parameter set has {} entries, the absorbers need {}",
                params.len(),
                self.parameter_count
            )));
        }
        Ok(())
    }
}
