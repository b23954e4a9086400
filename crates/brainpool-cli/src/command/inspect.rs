use std::path::PathBuf;

use brainpool_net::{Network, NetworkSizes, layout::Tensor};
use brainpool_stats::descriptive::DescriptiveStats;
use serde::Serialize;

use crate::util::{self, Output};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct InspectArg {
    /// Checkpoint to inspect
    checkpoint: PathBuf,
    /// `text` for a human-readable summary, `json` for a machine-readable one
    #[arg(long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct TensorSummary {
    name: &'static str,
    shape: (usize, usize),
    len: usize,
    mean: f32,
    std_dev: f32,
    min: f32,
    max: f32,
}

/// Location of the weight with the largest magnitude.
#[derive(Debug, Serialize)]
struct PeakWeight {
    tensor: &'static str,
    /// Offset within the tensor, row-major.
    offset: usize,
    value: f32,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    sizes: NetworkSizes,
    generation: u32,
    created_at: String,
    parameter_count: usize,
    tensors: Vec<TensorSummary>,
    peak_weight: Option<PeakWeight>,
    /// Policy and value for an all-zero observation from a zero hidden state.
    baseline_action_probs: Vec<f32>,
    baseline_value: f32,
}

pub(crate) fn run(arg: &InspectArg) -> anyhow::Result<()> {
    let checkpoint = util::read_checkpoint_file(&arg.checkpoint)?;
    let network = checkpoint.to_network()?;
    let sizes = network.sizes();

    let tensors = Tensor::ALL
        .into_iter()
        .filter_map(|tensor| {
            let stats = DescriptiveStats::new(network.tensor(tensor).iter().copied())?;
            Some(TensorSummary {
                name: tensor.name(),
                shape: tensor.shape(sizes),
                len: tensor.len(sizes),
                mean: stats.mean,
                std_dev: stats.std_dev,
                min: stats.min,
                max: stats.max,
            })
        })
        .collect();
    let baseline = network.forward(&vec![0.0; sizes.input], &network.zero_hidden());
    let report = InspectReport {
        sizes,
        generation: checkpoint.generation,
        created_at: checkpoint.created_at.to_rfc3339(),
        parameter_count: network.parameter_count(),
        tensors,
        peak_weight: peak_weight(&network),
        baseline_action_probs: baseline.action_probs,
        baseline_value: baseline.value,
    };

    match arg.format {
        OutputFormat::Json => Output::save_json(&report, None)?,
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn peak_weight(network: &Network) -> Option<PeakWeight> {
    let (index, &value) = network
        .weights_slice()
        .iter()
        .enumerate()
        .filter(|(_, w)| w.is_finite())
        .max_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))?;
    let layout = network.layout();
    let tensor = layout.tensor_of(index)?;
    Some(PeakWeight {
        tensor: tensor.name(),
        offset: index - layout.range(tensor).start,
        value,
    })
}

fn print_report(report: &InspectReport) {
    let NetworkSizes {
        input,
        hidden,
        output,
    } = report.sizes;
    println!("Sizes: input {input} / hidden {hidden} / output {output}");
    println!("Generation: {}", report.generation);
    println!("Created at: {}", report.created_at);
    println!("Parameters: {}", report.parameter_count);
    println!();
    println!(
        "  {:<8} {:>9} {:>6} {:>9} {:>9} {:>9} {:>9}",
        "tensor", "shape", "len", "mean", "std", "min", "max"
    );
    for t in &report.tensors {
        let shape = format!("{}x{}", t.shape.0, t.shape.1);
        println!(
            "  {:<8} {shape:>9} {:>6} {:>9.4} {:>9.4} {:>9.4} {:>9.4}",
            t.name, t.len, t.mean, t.std_dev, t.min, t.max
        );
    }
    if let Some(peak) = &report.peak_weight {
        println!();
        println!(
            "Largest weight: {:.4} ({} offset {})",
            peak.value, peak.tensor, peak.offset
        );
    }
    println!();
    println!("Baseline value: {:.4}", report.baseline_value);
    println!("Baseline policy: {:.3?}", report.baseline_action_probs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_weight_names_its_tensor() {
        let mut network = Network::zeroed(NetworkSizes::new(2, 3, 2));
        let dense2 = network.layout().range(Tensor::Dense2Weights);
        network.set_parameter(dense2.start + 4, -7.5);
        network.set_parameter(0, 2.0);

        let peak = peak_weight(&network).unwrap();
        assert_eq!(peak.tensor, Tensor::Dense2Weights.name());
        assert_eq!(peak.offset, 4);
        assert_eq!(peak.value, -7.5);
    }
}
