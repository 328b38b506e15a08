//! Per-point sweep output.

use super::parameter::SweepParameter;
use crate::error::Result;
use crate::field::Field;
use crate::interaction::ChiInteraction;
use crate::mixture::Mixture;
use crate::system::Thermo;
use crate::unit_cell::UnitCell;
use anyhow::Context;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;

/// Everything known about a newly accepted sweep point.
pub struct AcceptedPoint<'a> {
    /// Zero-based count of accepted points before this one.
    pub index: usize,
    pub s: f64,
    pub thermo: Thermo,
    pub parameters: &'a [SweepParameter],
    /// Current value of each sweep parameter, in order.
    pub values: &'a [f64],
    pub mixture: &'a Mixture,
    pub interaction: &'a ChiInteraction,
    pub unit_cell: &'a UnitCell,
    pub w_fields: &'a [Field],
    pub c_fields: &'a [Field],
}

/// Hook invoked by a sweep as it progresses.
pub trait SweepObserver {
    /// Called once before the initial point is solved.
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    fn accept(&mut self, point: &AcceptedPoint<'_>) -> Result<()>;

    /// Called once after the final point has been accepted.
    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Observer that discards every point.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SweepObserver for NullObserver {
    fn accept(&mut self, _point: &AcceptedPoint<'_>) -> Result<()> {
        Ok(())
    }
}

/// Serialises a field set.
pub trait FieldWriter {
    fn write_fields(
        &mut self,
        out: &mut dyn Write,
        fields: &[Field],
        unit_cell: &UnitCell,
    ) -> anyhow::Result<()>;
}

/// Plain-text symmetry-adapted basis format: a short header followed by
/// one row per basis function with one column per monomer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasisFieldWriter;

impl FieldWriter for BasisFieldWriter {
    fn write_fields(
        &mut self,
        out: &mut dyn Write,
        fields: &[Field],
        unit_cell: &UnitCell,
    ) -> anyhow::Result<()> {
        let n_basis = fields.first().map_or(0, |f| f.len());
        writeln!(out, "format   basis")?;
        writeln!(
            out,
            "lattice  {}",
            format!("{:?}", unit_cell.lattice()).to_lowercase()
        )?;
        write!(out, "cell    ")?;
        for parameter in unit_cell.parameters() {
            write!(out, " {parameter:.12e}")?;
        }
        writeln!(out)?;
        writeln!(out, "N_monomer {}", fields.len())?;
        writeln!(out, "N_basis   {n_basis}")?;
        for n in 0..n_basis {
            write!(out, "{n:6}")?;
            for field in fields {
                write!(out, " {:20.12e}", field[n])?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ParameterRecord {
    parameter: String,
    value: f64,
}

#[derive(Serialize)]
struct PointRecord<'a> {
    index: usize,
    s: f64,
    f_helmholtz: f64,
    pressure: f64,
    parameters: Vec<ParameterRecord>,
    chi: Vec<Vec<f64>>,
    mixture: &'a Mixture,
    unit_cell: &'a UnitCell,
}

/// Writes a summary log `<base>log` plus `<base><i>.prm`, `<base><i>.w` and
/// `<base><i>.c` for every accepted point `i`.
pub struct FileOutput<W: FieldWriter> {
    base: String,
    writer: W,
    log: Option<BufWriter<File>>,
}

impl FileOutput<BasisFieldWriter> {
    pub fn basis(base: impl Into<String>) -> Self {
        Self::new(base, BasisFieldWriter)
    }
}

impl<W: FieldWriter> FileOutput<W> {
    pub fn new(base: impl Into<String>, writer: W) -> Self {
        Self {
            base: base.into(),
            writer,
            log: None,
        }
    }

    pub fn path(&self, suffix: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.base, suffix))
    }

    fn write_parameters(&self, point: &AcceptedPoint<'_>) -> Result<()> {
        let record = PointRecord {
            index: point.index,
            s: point.s,
            f_helmholtz: point.thermo.f_helmholtz,
            pressure: point.thermo.pressure,
            parameters: point
                .parameters
                .iter()
                .zip(point.values)
                .map(|(parameter, &value)| ParameterRecord {
                    parameter: parameter.label(),
                    value,
                })
                .collect(),
            chi: point.interaction.chi_rows(),
            mixture: point.mixture,
            unit_cell: point.unit_cell,
        };
        let mut out = BufWriter::new(File::create(self.path(&format!("{}.prm", point.index)))?);
        serde_json::to_writer_pretty(&mut out, &record).map_err(io::Error::from)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }

    fn write_field_file(
        &mut self,
        suffix: &str,
        fields: &[Field],
        unit_cell: &UnitCell,
    ) -> Result<()> {
        let path = self.path(suffix);
        let mut out = BufWriter::new(File::create(&path)?);
        self.writer
            .write_fields(&mut out, fields, unit_cell)
            .with_context(|| format!("writing fields to {}", path.display()))?;
        out.flush()?;
        Ok(())
    }
}

impl<W: FieldWriter> SweepObserver for FileOutput<W> {
    fn setup(&mut self) -> Result<()> {
        let path = self.path("log");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.log = Some(BufWriter::new(File::create(&path)?));
        debug!(path = %path.display(), "opened sweep log");
        Ok(())
    }

    fn accept(&mut self, point: &AcceptedPoint<'_>) -> Result<()> {
        self.write_parameters(point)?;
        self.write_field_file(&format!("{}.w", point.index), point.w_fields, point.unit_cell)?;
        self.write_field_file(&format!("{}.c", point.index), point.c_fields, point.unit_cell)?;
        if let Some(log) = self.log.as_mut() {
            writeln!(
                log,
                "{:5} {:12.6} {:20.12e} {:20.12e}",
                point.index, point.s, point.thermo.f_helmholtz, point.thermo.pressure
            )?;
        }
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if let Some(mut log) = self.log.take() {
            log.flush()?;
        }
        Ok(())
    }
}
