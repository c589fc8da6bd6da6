//! Typed absorber hierarchy.
//!
//! A [`Species`] owns its [`Transition`]s and its [`Component`]s. Every
//! component belongs to a [`SharedVelocityGroup`], which holds the one radial
//! velocity all of its members report, so the same cloud seen in two species
//! can never drift apart.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoigtFitError};

/// Physical constants of one spectral line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Rest wavelength [Å]
    pub lambda0: f64,

    /// Oscillator strength
    pub f: f64,

    /// Damping constant [s⁻¹]
    pub gamma: f64,
}

impl Transition {
    pub fn new(lambda0: f64, f: f64, gamma: f64) -> Self {
        Self { lambda0, f, gamma }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.lambda0.is_finite() && self.f.is_finite() && self.gamma.is_finite()) {
            return Err(VoigtFitError::Configuration(format!(
                "transition {:?} has non-finite values",
                self
            )));
        }
        if self.lambda0 <= 0.0 {
            return Err(VoigtFitError::Configuration(format!(
                "rest wavelength must be positive, got {}",
                self.lambda0
            )));
        }
        if self.f < 0.0 || self.gamma < 0.0 {
            return Err(VoigtFitError::Configuration(format!(
                "oscillator strength and damping must be non-negative, got f = {}, gamma = {}",
                self.f, self.gamma
            )));
        }
        Ok(())
    }
}

/// Resolved values of one velocity component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cloud {
    /// Radial velocity [km/s]
    pub v_rad: f64,

    /// Doppler width [km/s]
    pub b: f64,

    /// Column density [cm⁻²]
    pub n: f64,
}

impl Cloud {
    pub fn new(v_rad: f64, b: f64, n: f64) -> Self {
        Self { v_rad, b, n }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.v_rad.is_finite() && self.b.is_finite() && self.n.is_finite()) {
            return Err(VoigtFitError::Configuration(format!(
                "component {:?} has non-finite values",
                self
            )));
        }
        if self.b <= 0.0 {
            return Err(VoigtFitError::Configuration(format!(
                "Doppler width must be positive, got {}",
                self.b
            )));
        }
        if self.n < 0.0 {
            return Err(VoigtFitError::Configuration(format!(
                "column density must be non-negative, got {}",
                self.n
            )));
        }
        Ok(())
    }
}

/// One absorption contribution: a transition seen through one cloud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub transition: Transition,
    pub cloud: Cloud,
}

/// Flat parallel arrays, one entry per (transition, component) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineList {
    pub lambda0: Vec<f64>,
    pub f: Vec<f64>,
    pub gamma: Vec<f64>,
    pub v_rad: Vec<f64>,
    pub b: Vec<f64>,
    pub n: Vec<f64>,
}

impl LineList {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lambda0: Vec::with_capacity(capacity),
            f: Vec::with_capacity(capacity),
            gamma: Vec::with_capacity(capacity),
            v_rad: Vec::with_capacity(capacity),
            b: Vec::with_capacity(capacity),
            n: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, line: Line) {
        self.lambda0.push(line.transition.lambda0);
        self.f.push(line.transition.f);
        self.gamma.push(line.transition.gamma);
        self.v_rad.push(line.cloud.v_rad);
        self.b.push(line.cloud.b);
        self.n.push(line.cloud.n);
    }

    pub fn len(&self) -> usize {
        self.lambda0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lambda0.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<Line> {
        if i >= self.len() {
            return None;
        }
        Some(Line {
            transition: Transition::new(self.lambda0[i], self.f[i], self.gamma[i]),
            cloud: Cloud::new(self.v_rad[i], self.b[i], self.n[i]),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Line> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

impl FromIterator<Line> for LineList {
    fn from_iter<I: IntoIterator<Item = Line>>(iter: I) -> Self {
        let mut list = LineList::default();
        for line in iter {
            list.push(line);
        }
        list
    }
}

/// A component of one species. Its velocity lives in the group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Index into [`Absorbers::groups`]
    pub group: usize,
    pub b: f64,
    pub n: f64,
}

/// Components across species that share one radial velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedVelocityGroup {
    pub velocity: f64,

    /// Component position the group was formed at
    pub component_index: usize,

    /// (species, component) pairs belonging to the group
    pub members: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    pub transitions: Vec<Transition>,
    pub components: Vec<Component>,
}

/// All species of a fit together with their velocity groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Absorbers {
    pub species: Vec<Species>,
    pub groups: Vec<SharedVelocityGroup>,
}

impl Absorbers {
    /// Build the hierarchy from per-species input.
    ///
    /// Components at the same position with the same initial velocity are
    /// placed in one group across species. Species without components are
    /// allowed here; fitting them requires a seeded component.
    pub fn from_specs(specs: &[SpeciesSpec]) -> Result<Self> {
        for (i, spec) in specs.iter().enumerate() {
            spec.validate()?;
            if specs[..i].iter().any(|other| other.name == spec.name) {
                return Err(VoigtFitError::Configuration(format!(
                    "duplicate species name '{}'",
                    spec.name
                )));
            }
        }

        let mut absorbers = Absorbers {
            species: Vec::with_capacity(specs.len()),
            groups: Vec::new(),
        };

        for (s, spec) in specs.iter().enumerate() {
            let transitions = spec
                .lambda
                .iter()
                .zip(&spec.f)
                .zip(&spec.gamma)
                .map(|((&lambda0, &f), &gamma)| Transition::new(lambda0, f, gamma))
                .collect();

            let mut components = Vec::with_capacity(spec.v_rad.len());
            for (k, ((&v_rad, &b), &n)) in spec.v_rad.iter().zip(&spec.b).zip(&spec.n).enumerate() {
                let existing = absorbers.groups.iter().position(|g| {
                    g.component_index == k
                        && g.velocity == v_rad
                        && g.members.iter().all(|&(member, _)| member != s)
                });
                let group = match existing {
                    Some(g) => g,
                    None => {
                        absorbers.groups.push(SharedVelocityGroup {
                            velocity: v_rad,
                            component_index: k,
                            members: Vec::new(),
                        });
                        absorbers.groups.len() - 1
                    }
                };
                absorbers.groups[group].members.push((s, k));
                components.push(Component { group, b, n });
            }

            absorbers.species.push(Species {
                name: spec.name.clone(),
                transitions,
                components,
            });
        }

        Ok(absorbers)
    }

    /// Resolved values of component `k` of species `s`.
    pub fn cloud(&self, s: usize, k: usize) -> Option<Cloud> {
        let component = self.species.get(s)?.components.get(k)?;
        let group = self.groups.get(component.group)?;
        Some(Cloud::new(group.velocity, component.b, component.n))
    }

    pub fn clouds(&self, s: usize) -> Vec<Cloud> {
        let count = self.species.get(s).map_or(0, |sp| sp.components.len());
        (0..count).filter_map(|k| self.cloud(s, k)).collect()
    }

    /// The component count shared by every species, or `None` if they differ.
    pub fn component_count(&self) -> Option<usize> {
        let first = self.species.first()?.components.len();
        self.species
            .iter()
            .all(|sp| sp.components.len() == first)
            .then_some(first)
    }

    pub fn total_components(&self) -> usize {
        self.species.iter().map(|sp| sp.components.len()).sum()
    }

    /// Add one component to every species, all in one new velocity group.
    ///
    /// Returns the index of the new group.
    pub fn add_component(&mut self, cloud: Cloud) -> usize {
        let group = self.groups.len();
        let component_index = self
            .species
            .iter()
            .map(|sp| sp.components.len())
            .max()
            .unwrap_or(0);

        let mut members = Vec::with_capacity(self.species.len());
        for (s, species) in self.species.iter_mut().enumerate() {
            members.push((s, species.components.len()));
            species.components.push(Component {
                group,
                b: cloud.b,
                n: cloud.n,
            });
        }

        self.groups.push(SharedVelocityGroup {
            velocity: cloud.v_rad,
            component_index,
            members,
        });
        group
    }

    /// Move velocity group `g` to `cloud.v_rad` and give every member
    /// component the cloud's b and N.
    pub fn reset_group(&mut self, g: usize, cloud: Cloud) -> Result<()> {
        let group = self.groups.get_mut(g).ok_or_else(|| {
            VoigtFitError::Configuration(format!("velocity group {} does not exist", g))
        })?;
        group.velocity = cloud.v_rad;
        for &(s, k) in &group.members {
            if let Some(component) = self.species.get_mut(s).and_then(|sp| sp.components.get_mut(k)) {
                component.b = cloud.b;
                component.n = cloud.n;
            }
        }
        Ok(())
    }

    /// Every (transition, component) pair, walking species, then
    /// components, then transitions.
    pub fn lines(&self) -> LineList {
        let mut list = LineList::default();
        for (s, species) in self.species.iter().enumerate() {
            for cloud in self.clouds(s) {
                for &transition in &species.transitions {
                    list.push(Line { transition, cloud });
                }
            }
        }
        list
    }

    /// Convert back to per-species input, for saving or reseeding a run.
    pub fn to_specs(&self) -> Vec<SpeciesSpec> {
        self.species
            .iter()
            .enumerate()
            .map(|(s, species)| {
                let clouds = self.clouds(s);
                SpeciesSpec {
                    name: species.name.clone(),
                    lambda: species.transitions.iter().map(|t| t.lambda0).collect(),
                    f: species.transitions.iter().map(|t| t.f).collect(),
                    gamma: species.transitions.iter().map(|t| t.gamma).collect(),
                    b: clouds.iter().map(|c| c.b).collect(),
                    n: clouds.iter().map(|c| c.n).collect(),
                    v_rad: clouds.iter().map(|c| c.v_rad).collect(),
                }
            })
            .collect()
    }
}

/// Per-species input: transitions and initial components as parallel arrays.
///
/// ```
/// use astrovoigt_rs::species::SpeciesSpec;
///
/// let spec: SpeciesSpec = serde_json::from_str(r#"{
///     "name": "CaI",
///     "lambda": [4226.728],
///     "f": [1.77],
///     "gamma": [2.2e8],
///     "b": [2.0],
///     "n": [5e10],
///     "v_rad": [-20.0]
/// }"#).unwrap();
/// assert!(spec.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSpec {
    pub name: String,
    pub lambda: Vec<f64>,
    pub f: Vec<f64>,
    pub gamma: Vec<f64>,
    #[serde(default)]
    pub b: Vec<f64>,
    #[serde(default, rename = "N", alias = "n")]
    pub n: Vec<f64>,
    #[serde(default)]
    pub v_rad: Vec<f64>,
}

impl SpeciesSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lambda: Vec::new(),
            f: Vec::new(),
            gamma: Vec::new(),
            b: Vec::new(),
            n: Vec::new(),
            v_rad: Vec::new(),
        }
    }

    pub fn with_transition(mut self, lambda0: f64, f: f64, gamma: f64) -> Self {
        self.lambda.push(lambda0);
        self.f.push(f);
        self.gamma.push(gamma);
        self
    }

    pub fn with_component(mut self, v_rad: f64, b: f64, n: f64) -> Self {
        self.v_rad.push(v_rad);
        self.b.push(b);
        self.n.push(n);
        self
    }

    pub fn component_count(&self) -> usize {
        self.v_rad.len()
    }

    /// Check that the arrays are complete and physically valid.
    pub fn validate(&self) -> Result<()> {
        if self.lambda.is_empty() {
            return Err(VoigtFitError::Configuration(format!(
                "species '{}' has no transitions",
                self.name
            )));
        }
        if self.f.len() != self.lambda.len() || self.gamma.len() != self.lambda.len() {
            return Err(VoigtFitError::Configuration(format!(
                "species '{}': lambda, f and gamma must have equal lengths ({}, {}, {})",
                self.name,
                self.lambda.len(),
                self.f.len(),
                self.gamma.len()
            )));
        }
        if self.b.len() != self.v_rad.len() || self.n.len() != self.v_rad.len() {
            return Err(VoigtFitError::Configuration(format!(
                "species '{}': b, N and v_rad must have equal lengths ({}, {}, {})",
                self.name,
                self.b.len(),
                self.n.len(),
                self.v_rad.len()
            )));
        }

        for ((&lambda0, &f), &gamma) in self.lambda.iter().zip(&self.f).zip(&self.gamma) {
            Transition::new(lambda0, f, gamma)
                .validate()
                .map_err(|e| in_species(&self.name, e))?;
        }
        for ((&v_rad, &b), &n) in self.v_rad.iter().zip(&self.b).zip(&self.n) {
            Cloud::new(v_rad, b, n)
                .validate()
                .map_err(|e| in_species(&self.name, e))?;
        }
        Ok(())
    }
}

fn in_species(name: &str, err: VoigtFitError) -> VoigtFitError {
    match err {
        VoigtFitError::Configuration(msg) => {
            VoigtFitError::Configuration(format!("species '{}': {}", name, msg))
        }
        other => other,
    }
}
