//! Architecture sizes and the canonical parameter-vector layout.
//!
//! Every weight and bias of a [`Network`](crate::network::Network) lives in a
//! single flat vector. The tensors are concatenated in one fixed order:
//!
//! ```text
//! Wz  Wr  Wh  bz  br  bh  W1  b1  W2  b2  Wactor  bactor  Wcritic  bcritic
//! ```
//!
//! Two networks with equal [`NetworkSizes`] therefore share the same layout, which
//! is what makes element-wise crossover and averaging meaningful.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Input, hidden, and output sizes of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkSizes {
    /// Observation length (I).
    pub input: usize,
    /// Recurrent hidden-state length (H).
    pub hidden: usize,
    /// Number of discrete actions (O).
    pub output: usize,
}

impl NetworkSizes {
    /// Creates a new set of sizes.
    ///
    /// # Panics
    ///
    /// Panics if any size is zero.
    #[must_use]
    pub fn new(input: usize, hidden: usize, output: usize) -> Self {
        let sizes = Self {
            input,
            hidden,
            output,
        };
        sizes.assert_valid();
        sizes
    }

    pub(crate) fn assert_valid(self) {
        assert!(
            self.input > 0 && self.hidden > 0 && self.output > 0,
            "network sizes must be non-zero: {self:?}"
        );
    }

    /// Length of the `[hidden, observation]` concatenation fed to the GRU gates.
    #[must_use]
    pub const fn concat(self) -> usize {
        self.hidden + self.input
    }

    /// Total number of parameters.
    ///
    /// `H·(H+I)·3 + H·3 + H·H·2 + H·2 + O·H + O + H + 1`
    ///
    /// ```
    /// use brainpool_net::layout::NetworkSizes;
    ///
    /// let sizes = NetworkSizes::new(20, 32, 14);
    /// assert_eq!(sizes.parameter_count(), 7695);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the count does not fit in `usize`.
    #[must_use]
    pub fn parameter_count(self) -> usize {
        let Some(count) = self.checked_parameter_count() else {
            panic!("parameter count of {self:?} overflows usize");
        };
        count
    }

    /// Like [`Self::parameter_count`], but returns `None` on overflow.
    ///
    /// Sizes read from untrusted data should go through this first.
    ///
    /// ```
    /// use brainpool_net::layout::NetworkSizes;
    ///
    /// let sizes = NetworkSizes { input: 1, hidden: usize::MAX / 2, output: 1 };
    /// assert_eq!(sizes.checked_parameter_count(), None);
    /// ```
    #[must_use]
    pub fn checked_parameter_count(self) -> Option<usize> {
        let i = self.input;
        let h = self.hidden;
        let o = self.output;
        let gates = h.checked_mul(h.checked_add(i)?)?.checked_mul(3)?;
        let dense = h.checked_mul(h)?.checked_mul(2)?;
        let heads = o.checked_mul(h)?;
        [gates, dense, heads, h.checked_mul(5)?, o, h, 1]
            .into_iter()
            .try_fold(0_usize, usize::checked_add)
    }
}

const TENSOR_COUNT: usize = 14;

/// The tensors of a network, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tensor {
    UpdateGateWeights,
    ResetGateWeights,
    CandidateWeights,
    UpdateGateBias,
    ResetGateBias,
    CandidateBias,
    Dense1Weights,
    Dense1Bias,
    Dense2Weights,
    Dense2Bias,
    ActorWeights,
    ActorBias,
    CriticWeights,
    CriticBias,
}

impl Tensor {
    /// All tensors in the order they appear in the parameter vector.
    pub const ALL: [Self; TENSOR_COUNT] = [
        Self::UpdateGateWeights,
        Self::ResetGateWeights,
        Self::CandidateWeights,
        Self::UpdateGateBias,
        Self::ResetGateBias,
        Self::CandidateBias,
        Self::Dense1Weights,
        Self::Dense1Bias,
        Self::Dense2Weights,
        Self::Dense2Bias,
        Self::ActorWeights,
        Self::ActorBias,
        Self::CriticWeights,
        Self::CriticBias,
    ];

    /// Short name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UpdateGateWeights => "Wz",
            Self::ResetGateWeights => "Wr",
            Self::CandidateWeights => "Wh",
            Self::UpdateGateBias => "bz",
            Self::ResetGateBias => "br",
            Self::CandidateBias => "bh",
            Self::Dense1Weights => "W1",
            Self::Dense1Bias => "b1",
            Self::Dense2Weights => "W2",
            Self::Dense2Bias => "b2",
            Self::ActorWeights => "Wactor",
            Self::ActorBias => "bactor",
            Self::CriticWeights => "Wcritic",
            Self::CriticBias => "bcritic",
        }
    }

    /// `(rows, cols)` of this tensor. Biases have a single column.
    #[must_use]
    pub const fn shape(self, sizes: NetworkSizes) -> (usize, usize) {
        let h = sizes.hidden;
        let o = sizes.output;
        match self {
            Self::UpdateGateWeights | Self::ResetGateWeights | Self::CandidateWeights => {
                (h, sizes.concat())
            }
            Self::Dense1Weights | Self::Dense2Weights => (h, h),
            Self::ActorWeights => (o, h),
            Self::CriticWeights => (1, h),
            Self::UpdateGateBias
            | Self::ResetGateBias
            | Self::CandidateBias
            | Self::Dense1Bias
            | Self::Dense2Bias => (h, 1),
            Self::ActorBias => (o, 1),
            Self::CriticBias => (1, 1),
        }
    }

    /// Number of elements in this tensor.
    #[must_use]
    pub const fn len(self, sizes: NetworkSizes) -> usize {
        let (rows, cols) = self.shape(sizes);
        rows * cols
    }

    /// Fan-in used for Xavier-style initialization, or `None` for biases.
    #[must_use]
    pub const fn fan_in(self, sizes: NetworkSizes) -> Option<usize> {
        if self.is_bias() {
            None
        } else {
            Some(self.shape(sizes).1)
        }
    }

    #[must_use]
    pub const fn is_bias(self) -> bool {
        matches!(
            self,
            Self::UpdateGateBias
                | Self::ResetGateBias
                | Self::CandidateBias
                | Self::Dense1Bias
                | Self::Dense2Bias
                | Self::ActorBias
                | Self::CriticBias
        )
    }
}

/// Offsets of every tensor within the flat parameter vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterLayout {
    sizes: NetworkSizes,
    offsets: [usize; TENSOR_COUNT + 1],
}

impl ParameterLayout {
    #[must_use]
    pub fn new(sizes: NetworkSizes) -> Self {
        sizes.assert_valid();
        let mut offsets = [0; TENSOR_COUNT + 1];
        for (i, tensor) in Tensor::ALL.iter().enumerate() {
            offsets[i + 1] = offsets[i] + tensor.len(sizes);
        }
        debug_assert_eq!(offsets[TENSOR_COUNT], sizes.parameter_count());
        Self { sizes, offsets }
    }

    #[must_use]
    pub fn sizes(&self) -> NetworkSizes {
        self.sizes
    }

    /// Range of `tensor` within the parameter vector.
    #[must_use]
    pub fn range(&self, tensor: Tensor) -> Range<usize> {
        let i = tensor as usize;
        self.offsets[i]..self.offsets[i + 1]
    }

    /// Total parameter count; equal to [`NetworkSizes::parameter_count`].
    #[must_use]
    pub fn total(&self) -> usize {
        self.offsets[TENSOR_COUNT]
    }

    /// Finds which tensor a flat parameter index belongs to.
    #[must_use]
    pub fn tensor_of(&self, index: usize) -> Option<Tensor> {
        Tensor::ALL
            .iter()
            .copied()
            .find(|&t| self.range(t).contains(&index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_count_matches_layout() {
        for (i, h, o) in [(1, 1, 1), (20, 32, 14), (3, 5, 2), (7, 1, 9)] {
            let sizes = NetworkSizes::new(i, h, o);
            let layout = ParameterLayout::new(sizes);
            let sum: usize = Tensor::ALL.iter().map(|t| t.len(sizes)).sum();
            assert_eq!(layout.total(), sizes.parameter_count());
            assert_eq!(sum, sizes.parameter_count());
        }
    }

    #[test]
    fn test_checked_parameter_count_detects_overflow() {
        let sizes = NetworkSizes::new(20, 32, 14);
        assert_eq!(sizes.checked_parameter_count(), Some(7695));

        let huge = NetworkSizes {
            input: 1,
            hidden: 1 << 32,
            output: 1,
        };
        assert_eq!(huge.checked_parameter_count(), None);
        let wide = NetworkSizes {
            input: usize::MAX,
            hidden: 1,
            output: 1,
        };
        assert_eq!(wide.checked_parameter_count(), None);
    }

    #[test]
    fn test_ranges_are_contiguous_in_canonical_order() {
        let layout = ParameterLayout::new(NetworkSizes::new(4, 3, 2));
        let mut expected_start = 0;
        for tensor in Tensor::ALL {
            let range = layout.range(tensor);
            assert_eq!(range.start, expected_start, "{}", tensor.name());
            expected_start = range.end;
        }
        assert_eq!(expected_start, layout.total());
    }

    #[test]
    fn test_fan_in() {
        let sizes = NetworkSizes::new(20, 32, 14);
        assert_eq!(Tensor::UpdateGateWeights.fan_in(sizes), Some(52));
        assert_eq!(Tensor::Dense2Weights.fan_in(sizes), Some(32));
        assert_eq!(Tensor::ActorWeights.fan_in(sizes), Some(32));
        assert_eq!(Tensor::CriticWeights.fan_in(sizes), Some(32));
        assert_eq!(Tensor::ActorBias.fan_in(sizes), None);
    }

    #[test]
    fn test_tensor_of() {
        let sizes = NetworkSizes::new(2, 2, 2);
        let layout = ParameterLayout::new(sizes);
        assert_eq!(layout.tensor_of(0), Some(Tensor::UpdateGateWeights));
        assert_eq!(
            layout.tensor_of(layout.total() - 1),
            Some(Tensor::CriticBias)
        );
        assert_eq!(layout.tensor_of(layout.total()), None);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn test_zero_hidden_size_panics() {
        let _ = NetworkSizes::new(4, 0, 2);
    }
}
