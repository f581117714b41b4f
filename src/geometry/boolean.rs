// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean operations and the fragment decision table

use super::classification::Side;
use crate::error::CsgError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanOp {
    Union,
    /// A minus B
    Subtract,
    /// B minus A
    ReverseSubtract,
    Intersect,
    SymmetricDifference,
    /// Open shell of A outside B
    HollowSubtract,
    /// Open shell of A inside B
    HollowIntersect,
}

impl BooleanOp {
    pub const ALL: [BooleanOp; 7] = [
        BooleanOp::Union,
        BooleanOp::Subtract,
        BooleanOp::ReverseSubtract,
        BooleanOp::Intersect,
        BooleanOp::SymmetricDifference,
        BooleanOp::HollowSubtract,
        BooleanOp::HollowIntersect,
    ];

    /// Whether fragments of the second operand can ever survive
    pub fn needs_second_operand(self) -> bool {
        !matches!(self, BooleanOp::HollowSubtract | BooleanOp::HollowIntersect)
    }

    pub fn name(self) -> &'static str {
        match self {
            BooleanOp::Union => "union",
            BooleanOp::Subtract => "subtract",
            BooleanOp::ReverseSubtract => "reverse_subtract",
            BooleanOp::Intersect => "intersect",
            BooleanOp::SymmetricDifference => "symmetric_difference",
            BooleanOp::HollowSubtract => "hollow_subtract",
            BooleanOp::HollowIntersect => "hollow_intersect",
        }
    }
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BooleanOp {
    type Err = CsgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "difference" => Ok(BooleanOp::Subtract),
            "intersection" => Ok(BooleanOp::Intersect),
            other => BooleanOp::ALL
                .into_iter()
                .find(|op| op.name() == other)
                .ok_or_else(|| CsgError::InvalidOperation(s.to_string())),
        }
    }
}

/// What happens to a classified fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Keep,
    /// Keep with reversed winding and negated normals
    KeepInverted,
    Discard,
}

/// The boolean algebra: decide a fragment's fate from its side relative to
/// the other operand and which operand it came from.
pub fn decide(op: BooleanOp, side: Side, is_second_operand: bool) -> Action {
    use Action::{Discard, Keep, KeepInverted};
    use Side::{Back, CoplanarAligned, CoplanarOpposite, Front};

    match (op, is_second_operand, side) {
        (BooleanOp::Union, _, Front) => Keep,
        (BooleanOp::Union, false, CoplanarAligned) => Keep,
        (BooleanOp::Union, _, _) => Discard,

        (BooleanOp::Subtract, false, Front | CoplanarOpposite) => Keep,
        (BooleanOp::Subtract, true, Back) => KeepInverted,
        (BooleanOp::Subtract, _, _) => Discard,

        (BooleanOp::ReverseSubtract, false, Back) => KeepInverted,
        (BooleanOp::ReverseSubtract, true, Front | CoplanarOpposite) => Keep,
        (BooleanOp::ReverseSubtract, _, _) => Discard,

        (BooleanOp::Intersect, _, Back) => Keep,
        (BooleanOp::Intersect, false, CoplanarAligned) => Keep,
        (BooleanOp::Intersect, _, _) => Discard,

        (BooleanOp::SymmetricDifference, false, Back) => KeepInverted,
        (BooleanOp::SymmetricDifference, false, Front) => Keep,
        (BooleanOp::SymmetricDifference, true, Front | CoplanarOpposite) => Keep,
        (BooleanOp::SymmetricDifference, true, Back) => KeepInverted,
        (BooleanOp::SymmetricDifference, _, _) => Discard,

        (BooleanOp::HollowSubtract, false, Front | CoplanarOpposite) => Keep,
        (BooleanOp::HollowIntersect, false, Back | CoplanarAligned) => Keep,
        (BooleanOp::HollowSubtract | BooleanOp::HollowIntersect, _, _) => Discard,
    }
}
