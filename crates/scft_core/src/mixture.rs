//! Polymer and solvent species making up the system.

use crate::error::{Result, ScftError};
use serde::{Deserialize, Serialize};

/// Statistical ensemble of one molecular species.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Ensemble {
    /// Fixed volume fraction `phi`; `mu` is computed.
    Closed,
    /// Fixed chemical potential `mu`; `phi` is computed.
    Open,
}

impl Ensemble {
    fn name(self) -> &'static str {
        match self {
            Ensemble::Closed => "closed",
            Ensemble::Open => "open",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monomer {
    /// Statistical segment length.
    pub kuhn: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub monomer_id: usize,
    pub length: f64,
    /// Copy of the monomer's segment length, kept in sync by
    /// [`Mixture::set_kuhn`].
    pub kuhn: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polymer {
    pub blocks: Vec<Block>,
    pub ensemble: Ensemble,
    pub phi: f64,
    pub mu: f64,
}

impl Polymer {
    /// Total chain length, summed over blocks.
    pub fn length(&self) -> f64 {
        self.blocks.iter().map(|b| b.length).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solvent {
    pub monomer_id: usize,
    pub size: f64,
    pub ensemble: Ensemble,
    pub phi: f64,
    pub mu: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mixture {
    pub monomers: Vec<Monomer>,
    pub polymers: Vec<Polymer>,
    #[serde(default)]
    pub solvents: Vec<Solvent>,
}

impl Mixture {
    pub fn n_monomer(&self) -> usize {
        self.monomers.len()
    }

    /// True when every species has a fixed population.
    pub fn is_canonical(&self) -> bool {
        self.polymers.iter().all(|p| p.ensemble == Ensemble::Closed)
            && self.solvents.iter().all(|s| s.ensemble == Ensemble::Closed)
    }

    /// Checks that blocks and solvents refer to existing monomers and that
    /// cached block segment lengths match their monomer.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_monomer();
        for polymer in &self.polymers {
            for block in &polymer.blocks {
                if block.monomer_id >= n {
                    return Err(ScftError::InvalidParameterIndex {
                        what: "monomer",
                        index: block.monomer_id,
                        count: n,
                    });
                }
                if block.kuhn != self.monomers[block.monomer_id].kuhn {
                    return Err(ScftError::InvalidSettings(format!(
                        "block segment length {} differs from monomer {} ({})",
                        block.kuhn, block.monomer_id, self.monomers[block.monomer_id].kuhn
                    )));
                }
            }
        }
        for solvent in &self.solvents {
            if solvent.monomer_id >= n {
                return Err(ScftError::InvalidParameterIndex {
                    what: "monomer",
                    index: solvent.monomer_id,
                    count: n,
                });
            }
        }
        Ok(())
    }

    pub fn monomer(&self, id: usize) -> Result<&Monomer> {
        self.monomers.get(id).ok_or(ScftError::InvalidParameterIndex {
            what: "monomer",
            index: id,
            count: self.monomers.len(),
        })
    }

    pub fn polymer(&self, id: usize) -> Result<&Polymer> {
        self.polymers.get(id).ok_or(ScftError::InvalidParameterIndex {
            what: "polymer",
            index: id,
            count: self.polymers.len(),
        })
    }

    pub fn polymer_mut(&mut self, id: usize) -> Result<&mut Polymer> {
        let count = self.polymers.len();
        self.polymers
            .get_mut(id)
            .ok_or(ScftError::InvalidParameterIndex {
                what: "polymer",
                index: id,
                count,
            })
    }

    pub fn block(&self, polymer: usize, block: usize) -> Result<&Block> {
        let polymer = self.polymer(polymer)?;
        polymer.blocks.get(block).ok_or(ScftError::InvalidParameterIndex {
            what: "block",
            index: block,
            count: polymer.blocks.len(),
        })
    }

    pub fn block_mut(&mut self, polymer: usize, block: usize) -> Result<&mut Block> {
        let polymer = self.polymer_mut(polymer)?;
        let count = polymer.blocks.len();
        polymer
            .blocks
            .get_mut(block)
            .ok_or(ScftError::InvalidParameterIndex {
                what: "block",
                index: block,
                count,
            })
    }

    pub fn solvent(&self, id: usize) -> Result<&Solvent> {
        self.solvents.get(id).ok_or(ScftError::InvalidParameterIndex {
            what: "solvent",
            index: id,
            count: self.solvents.len(),
        })
    }

    pub fn solvent_mut(&mut self, id: usize) -> Result<&mut Solvent> {
        let count = self.solvents.len();
        self.solvents
            .get_mut(id)
            .ok_or(ScftError::InvalidParameterIndex {
                what: "solvent",
                index: id,
                count,
            })
    }

    pub fn set_block_length(&mut self, polymer: usize, block: usize, length: f64) -> Result<()> {
        self.block_mut(polymer, block)?.length = length;
        Ok(())
    }

    /// Sets a monomer's segment length and copies it into every block of
    /// that monomer type.
    pub fn set_kuhn(&mut self, monomer: usize, kuhn: f64) -> Result<()> {
        let count = self.monomers.len();
        let target = self
            .monomers
            .get_mut(monomer)
            .ok_or(ScftError::InvalidParameterIndex {
                what: "monomer",
                index: monomer,
                count,
            })?;
        target.kuhn = kuhn;
        for block in self.polymers.iter_mut().flat_map(|p| p.blocks.iter_mut()) {
            if block.monomer_id == monomer {
                block.kuhn = kuhn;
            }
        }
        Ok(())
    }

    pub fn set_polymer_phi(&mut self, id: usize, phi: f64) -> Result<()> {
        let polymer = self.polymer_mut(id)?;
        require_ensemble(polymer.ensemble, Ensemble::Closed, "phi")?;
        polymer.phi = phi;
        Ok(())
    }

    pub fn set_polymer_mu(&mut self, id: usize, mu: f64) -> Result<()> {
        let polymer = self.polymer_mut(id)?;
        require_ensemble(polymer.ensemble, Ensemble::Open, "mu")?;
        polymer.mu = mu;
        Ok(())
    }

    pub fn set_solvent_phi(&mut self, id: usize, phi: f64) -> Result<()> {
        let solvent = self.solvent_mut(id)?;
        require_ensemble(solvent.ensemble, Ensemble::Closed, "phi")?;
        solvent.phi = phi;
        Ok(())
    }

    pub fn set_solvent_mu(&mut self, id: usize, mu: f64) -> Result<()> {
        let solvent = self.solvent_mut(id)?;
        require_ensemble(solvent.ensemble, Ensemble::Open, "mu")?;
        solvent.mu = mu;
        Ok(())
    }

    pub fn set_solvent_size(&mut self, id: usize, size: f64) -> Result<()> {
        self.solvent_mut(id)?.size = size;
        Ok(())
    }
}

fn require_ensemble(actual: Ensemble, required: Ensemble, quantity: &'static str) -> Result<()> {
    if actual != required {
        return Err(ScftError::EnsembleMismatch {
            quantity,
            ensemble: actual.name(),
        });
    }
    Ok(())
}
