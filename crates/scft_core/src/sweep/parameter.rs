//! Sweep parameters: named host quantities varied linearly along a sweep.
//!
//! A parameter is written as `<type> <ids...> <change>`, e.g. `chi 0 1 4.0`
//! or `kuhn 1 -0.2`. Along the path coordinate `s` in `[0, 1]` its value is
//! `initial + s * change`, where `initial` is read from the host when the
//! sweep starts.

use crate::error::{Result, ScftError};
use crate::traits::ParameterHost;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of host quantity a sweep parameter controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    Block,
    Chi,
    Kuhn,
    PhiPolymer,
    PhiSolvent,
    MuPolymer,
    MuSolvent,
    SolventSize,
}

impl ParameterType {
    /// Parses a type token, ignoring case.
    pub fn from_token(token: &str) -> Result<Self> {
        match token.to_ascii_lowercase().as_str() {
            "block" | "block_length" => Ok(ParameterType::Block),
            "chi" => Ok(ParameterType::Chi),
            "kuhn" => Ok(ParameterType::Kuhn),
            "phi_polymer" => Ok(ParameterType::PhiPolymer),
            "phi_solvent" => Ok(ParameterType::PhiSolvent),
            "mu_polymer" => Ok(ParameterType::MuPolymer),
            "mu_solvent" => Ok(ParameterType::MuSolvent),
            "solvent" | "solvent_size" => Ok(ParameterType::SolventSize),
            _ => Err(ScftError::InvalidParameterType(token.to_string())),
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            ParameterType::Block => "block",
            ParameterType::Chi => "chi",
            ParameterType::Kuhn => "kuhn",
            ParameterType::PhiPolymer => "phi_polymer",
            ParameterType::PhiSolvent => "phi_solvent",
            ParameterType::MuPolymer => "mu_polymer",
            ParameterType::MuSolvent => "mu_solvent",
            ParameterType::SolventSize => "solvent_size",
        }
    }

    /// Number of integer ids following the type token.
    pub fn n_id(self) -> usize {
        match self {
            ParameterType::Block | ParameterType::Chi => 2,
            _ => 1,
        }
    }
}

/// A parameter type together with the ids selecting one host quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Length of block `block` of polymer `polymer`.
    Block { polymer: usize, block: usize },
    /// Interaction between monomers `i` and `j`, set symmetrically.
    Chi { i: usize, j: usize },
    /// Segment length of a monomer type, copied into its blocks.
    Kuhn { monomer: usize },
    PhiPolymer { polymer: usize },
    PhiSolvent { solvent: usize },
    MuPolymer { polymer: usize },
    MuSolvent { solvent: usize },
    SolventSize { solvent: usize },
}

impl ParameterKind {
    pub fn new(kind: ParameterType, ids: &[usize]) -> Result<Self> {
        if ids.len() != kind.n_id() {
            return Err(ScftError::MalformedParameter {
                line: kind.token().to_string(),
                reason: format!("expected {} ids, got {}", kind.n_id(), ids.len()),
            });
        }
        Ok(match kind {
            ParameterType::Block => ParameterKind::Block {
                polymer: ids[0],
                block: ids[1],
            },
            ParameterType::Chi => ParameterKind::Chi { i: ids[0], j: ids[1] },
            ParameterType::Kuhn => ParameterKind::Kuhn { monomer: ids[0] },
            ParameterType::PhiPolymer => ParameterKind::PhiPolymer { polymer: ids[0] },
            ParameterType::PhiSolvent => ParameterKind::PhiSolvent { solvent: ids[0] },
            ParameterType::MuPolymer => ParameterKind::MuPolymer { polymer: ids[0] },
            ParameterType::MuSolvent => ParameterKind::MuSolvent { solvent: ids[0] },
            ParameterType::SolventSize => ParameterKind::SolventSize { solvent: ids[0] },
        })
    }

    pub fn parameter_type(&self) -> ParameterType {
        match self {
            ParameterKind::Block { .. } => ParameterType::Block,
            ParameterKind::Chi { .. } => ParameterType::Chi,
            ParameterKind::Kuhn { .. } => ParameterType::Kuhn,
            ParameterKind::PhiPolymer { .. } => ParameterType::PhiPolymer,
            ParameterKind::PhiSolvent { .. } => ParameterType::PhiSolvent,
            ParameterKind::MuPolymer { .. } => ParameterType::MuPolymer,
            ParameterKind::MuSolvent { .. } => ParameterType::MuSolvent,
            ParameterKind::SolventSize { .. } => ParameterType::SolventSize,
        }
    }

    pub fn ids(&self) -> Vec<usize> {
        match *self {
            ParameterKind::Block { polymer, block } => vec![polymer, block],
            ParameterKind::Chi { i, j } => vec![i, j],
            ParameterKind::Kuhn { monomer } => vec![monomer],
            ParameterKind::PhiPolymer { polymer } | ParameterKind::MuPolymer { polymer } => {
                vec![polymer]
            }
            ParameterKind::PhiSolvent { solvent }
            | ParameterKind::MuSolvent { solvent }
            | ParameterKind::SolventSize { solvent } => vec![solvent],
        }
    }

    /// Reads the current value from the host.
    pub fn get<H: ParameterHost + ?Sized>(&self, host: &H) -> Result<f64> {
        let mixture = host.mixture();
        match *self {
            ParameterKind::Block { polymer, block } => Ok(mixture.block(polymer, block)?.length),
            ParameterKind::Chi { i, j } => {
                let interaction = host.interaction();
                let n = interaction.n_monomer();
                if let Some(&index) = [i, j].iter().find(|&&index| index >= n) {
                    return Err(ScftError::InvalidParameterIndex {
                        what: "monomer",
                        index,
                        count: n,
                    });
                }
                Ok(interaction.chi(i, j))
            }
            ParameterKind::Kuhn { monomer } => Ok(mixture.monomer(monomer)?.kuhn),
            ParameterKind::PhiPolymer { polymer } => Ok(mixture.polymer(polymer)?.phi),
            ParameterKind::PhiSolvent { solvent } => Ok(mixture.solvent(solvent)?.phi),
            ParameterKind::MuPolymer { polymer } => Ok(mixture.polymer(polymer)?.mu),
            ParameterKind::MuSolvent { solvent } => Ok(mixture.solvent(solvent)?.mu),
            ParameterKind::SolventSize { solvent } => Ok(mixture.solvent(solvent)?.size),
        }
    }

    /// Writes `value` into the host.
    pub fn set<H: ParameterHost + ?Sized>(&self, host: &mut H, value: f64) -> Result<()> {
        match *self {
            ParameterKind::Block { polymer, block } => {
                host.mixture_mut().set_block_length(polymer, block, value)
            }
            ParameterKind::Chi { i, j } => host.interaction_mut().set_chi(i, j, value),
            ParameterKind::Kuhn { monomer } => host.mixture_mut().set_kuhn(monomer, value),
            ParameterKind::PhiPolymer { polymer } => {
                host.mixture_mut().set_polymer_phi(polymer, value)
            }
            ParameterKind::PhiSolvent { solvent } => {
                host.mixture_mut().set_solvent_phi(solvent, value)
            }
            ParameterKind::MuPolymer { polymer } => {
                host.mixture_mut().set_polymer_mu(polymer, value)
            }
            ParameterKind::MuSolvent { solvent } => {
                host.mixture_mut().set_solvent_mu(solvent, value)
            }
            ParameterKind::SolventSize { solvent } => {
                host.mixture_mut().set_solvent_size(solvent, value)
            }
        }
    }
}

/// One linearly varied host quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SweepParameter {
    kind: ParameterKind,
    change: f64,
    initial: Option<f64>,
}

impl SweepParameter {
    pub fn new(kind: ParameterKind, change: f64) -> Self {
        Self {
            kind,
            change,
            initial: None,
        }
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn change(&self) -> f64 {
        self.change
    }

    /// Value recorded by [`SweepParameter::get_initial`], if any.
    pub fn initial(&self) -> Option<f64> {
        self.initial
    }

    /// Records the host's current value as the start of the path.
    pub fn get_initial<H: ParameterHost + ?Sized>(&mut self, host: &H) -> Result<f64> {
        let value = self.kind.get(host)?;
        self.initial = Some(value);
        Ok(value)
    }

    /// Target value at path coordinate `s`.
    pub fn current(&self, s: f64) -> Result<f64> {
        let initial = self.initial.ok_or_else(|| {
            ScftError::InvalidSettings(format!(
                "initial value of sweep parameter \"{self}\" has not been recorded"
            ))
        })?;
        Ok(initial + s * self.change)
    }

    /// Sets the host quantity to its value at path coordinate `s`.
    pub fn update<H: ParameterHost + ?Sized>(&self, host: &mut H, s: f64) -> Result<()> {
        let value = self.current(s)?;
        self.kind.set(host, value)
    }

    pub fn get<H: ParameterHost + ?Sized>(&self, host: &H) -> Result<f64> {
        self.kind.get(host)
    }

    /// Parameter name without the change, e.g. `chi 0 1`.
    pub fn label(&self) -> String {
        let mut label = self.kind.parameter_type().token().to_string();
        for id in self.kind.ids() {
            label.push(' ');
            label.push_str(&id.to_string());
        }
        label
    }
}

impl fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.label(), self.change)
    }
}

impl FromStr for SweepParameter {
    type Err = ScftError;

    fn from_str(line: &str) -> Result<Self> {
        let malformed = |reason: String| ScftError::MalformedParameter {
            line: line.to_string(),
            reason,
        };
        let mut tokens = line.split_whitespace();
        let token = tokens
            .next()
            .ok_or_else(|| malformed("empty parameter line".into()))?;
        let parameter_type = ParameterType::from_token(token)?;

        let mut ids = Vec::with_capacity(parameter_type.n_id());
        for _ in 0..parameter_type.n_id() {
            let id = tokens
                .next()
                .ok_or_else(|| malformed(format!("expected {} ids", parameter_type.n_id())))?;
            ids.push(
                id.parse::<usize>()
                    .map_err(|err| malformed(format!("bad id \"{id}\": {err}")))?,
            );
        }
        let change = tokens
            .next()
            .ok_or_else(|| malformed("missing change".into()))?;
        let change = change
            .parse::<f64>()
            .map_err(|err| malformed(format!("bad change \"{change}\": {err}")))?;
        if let Some(extra) = tokens.next() {
            return Err(malformed(format!("unexpected token \"{extra}\"")));
        }

        Ok(SweepParameter::new(
            ParameterKind::new(parameter_type, &ids)?,
            change,
        ))
    }
}

impl TryFrom<String> for SweepParameter {
    type Error = ScftError;

    fn try_from(line: String) -> Result<Self> {
        line.parse()
    }
}

impl From<SweepParameter> for String {
    fn from(parameter: SweepParameter) -> Self {
        parameter.to_string()
    }
}
