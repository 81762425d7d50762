//! Conversion of SPICE3 rawfiles into engine-independent [`SimOutput`]s.
//!
//! Xyce writes the same rawfile format with `-r`, so the Xyce plugin reuses
//! these helpers.

use std::collections::HashMap;
use std::path::Path;
use std::process::Output;

use finchar::error::{ErrorSource, FincharError, Result};
use finchar::verification::simulation::{
    names, AcData, Analysis, AnalysisData, AnalysisType, ComplexSignal, DcData, OpData,
    Quantity, RealSignal, ScalarSignal, SimInput, SimOutput, TranData,
};
use spice_rawfile::{Analysis as RawAnalysis, Data, Rawfile};

/// Number of trailing output lines kept in failure messages.
const TAIL_LINES: usize = 8;

const CONVERGENCE_MARKERS: [&str; 7] = [
    "timestep too small",
    "time step too small",
    "convergence",
    "singular matrix",
    "gmin stepping failed",
    "source stepping failed",
    "nonlinear solver failed",
];

/// Reads and parses the rawfile at `path`, arranging its plots in the order
/// of `input.analyses`.
pub fn read_rawfile(input: &SimInput, path: impl AsRef<Path>) -> Result<SimOutput> {
    let path = path.as_ref();
    let data = finchar::io::read(path)?;
    let raw = spice_rawfile::parse(&data).map_err(|e| ErrorSource::RawfileParsing(e.to_string()))?;
    arrange_rawfile(input, raw)
}

/// Matches each plot in `raw` to the first unfilled analysis of the same type.
pub fn arrange_rawfile(input: &SimInput, raw: Rawfile) -> Result<SimOutput> {
    let mut out: Vec<Option<AnalysisData>> = vec![None; input.analyses.len()];
    for an in raw.analyses {
        let t = atype(&an);
        let slot = input
            .analyses
            .iter()
            .zip(out.iter())
            .position(|(a, data)| data.is_none() && a.analysis_type() == t);
        match slot {
            Some(idx) => out[idx] = Some(parse_analysis(&input.analyses[idx], an)?),
            None => log::debug!("ignoring unrequested plot `{}`", an.plotname),
        }
    }

    let data = out
        .into_iter()
        .enumerate()
        .map(|(idx, data)| data.ok_or_else(|| ErrorSource::MissingAnalysis(idx).into()))
        .collect::<Result<Vec<_>>>()?;
    Ok(SimOutput { data })
}

fn atype(raw: &RawAnalysis) -> AnalysisType {
    let name = raw.plotname.to_lowercase();
    if name.contains("ac analysis") {
        AnalysisType::Ac
    } else if name.contains("transient") {
        AnalysisType::Tran
    } else if name.contains("operating") {
        AnalysisType::Op
    } else if name.contains("dc transfer") {
        AnalysisType::Dc
    } else {
        AnalysisType::Other
    }
}

fn parse_analysis(input: &Analysis, output: RawAnalysis) -> Result<AnalysisData> {
    Ok(match input {
        Analysis::Ac(_) => parse_ac(output)?.into(),
        Analysis::Tran(_) => parse_tran(output)?.into(),
        Analysis::Op(_) => parse_op(output)?.into(),
        Analysis::Dc(_) => parse_dc(output)?.into(),
    })
}

fn malformed(msg: impl Into<String>) -> FincharError {
    ErrorSource::RawfileParsing(msg.into()).into()
}

fn real_data(data: Data) -> Result<Vec<Vec<f64>>> {
    data.into_real()
        .ok_or_else(|| malformed("expected real data, found complex"))
}

/// Splits off the scale vector, which SPICE3 rawfiles always list first.
fn split_scale<T>(mut signals: Vec<T>, plot: &str) -> Result<(T, Vec<T>)> {
    if signals.is_empty() {
        return Err(malformed(format!("plot `{plot}` has no variables")));
    }
    let scale = signals.remove(0);
    Ok((scale, signals))
}

fn parse_ac(output: RawAnalysis) -> Result<AcData> {
    let data = output
        .data
        .into_complex()
        .ok_or_else(|| malformed("expected complex data in AC analysis"))?;
    let signals = data
        .into_iter()
        .zip(output.variables.iter())
        .map(|(sig, var)| {
            (
                names::canonical(var.name),
                ComplexSignal {
                    real: sig.real,
                    imag: sig.imag,
                    quantity: Quantity::from_rawfile_unit(var.unit),
                },
            )
        })
        .collect::<Vec<_>>();

    let ((_, freq), rest) = split_scale(signals, output.plotname)?;
    Ok(AcData {
        data: rest.into_iter().collect(),
        freq: RealSignal {
            values: freq.real,
            quantity: Quantity::Frequency,
        },
    })
}

fn real_signals(output: RawAnalysis) -> Result<Vec<(String, RealSignal)>> {
    let data = real_data(output.data)?;
    Ok(data
        .into_iter()
        .zip(output.variables.iter())
        .map(|(values, var)| {
            (
                names::canonical(var.name),
                RealSignal {
                    values,
                    quantity: Quantity::from_rawfile_unit(var.unit),
                },
            )
        })
        .collect())
}

fn parse_tran(output: RawAnalysis) -> Result<TranData> {
    let plot = output.plotname;
    let ((_, mut time), rest) = split_scale(real_signals(output)?, plot)?;
    time.quantity = Quantity::Time;
    Ok(TranData {
        data: rest.into_iter().collect(),
        time,
    })
}

fn parse_dc(output: RawAnalysis) -> Result<DcData> {
    let plot = output.plotname;
    let ((_, sweep), rest) = split_scale(real_signals(output)?, plot)?;
    let mut data: HashMap<String, RealSignal> = rest.into_iter().collect();
    data.insert(names::SWEEP.to_string(), sweep);
    Ok(DcData { data })
}

fn parse_op(output: RawAnalysis) -> Result<OpData> {
    let data = real_signals(output)?
        .into_iter()
        .map(|(name, sig)| match sig.values.as_slice() {
            [value] => Ok((
                name,
                ScalarSignal {
                    value: *value,
                    quantity: sig.quantity,
                },
            )),
            values => Err(malformed(format!(
                "operating point signal `{name}` has {} values",
                values.len()
            ))),
        })
        .collect::<Result<HashMap<_, _>>>()?;
    Ok(OpData { data })
}

/// The last few non-empty lines of the process output, stdout first.
pub fn output_tail(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    lines[lines.len().saturating_sub(TAIL_LINES)..].join("\n")
}

/// Classifies a failed run from its exit status and output.
///
/// Output mentioning a convergence problem yields [`ErrorSource::Convergence`];
/// anything else is reported as [`ErrorSource::SimulatorFailed`].
pub fn classify_failure(output: &Output) -> FincharError {
    let tail = output_tail(output);
    let text = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
    .to_lowercase();

    if CONVERGENCE_MARKERS.iter().any(|m| text.contains(m)) {
        ErrorSource::Convergence(tail).into()
    } else {
        ErrorSource::SimulatorFailed {
            status: output.status.to_string(),
            message: tail,
        }
        .into()
    }
}

/// Writes the combined process output to `path` for later inspection.
pub fn write_log(path: impl AsRef<Path>, output: &Output) -> Result<()> {
    let mut contents = output.stdout.clone();
    contents.extend_from_slice(&output.stderr);
    finchar::io::write(path, contents)
}
