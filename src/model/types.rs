/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 11/8/24
******************************************************************************/
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Defines the directional exposure of a financial position.
///
/// This enum represents the market sentiment or directional bias of a position.
/// It indicates whether a trader expects to profit from rising prices (Long)
/// or falling prices (Short).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
pub enum Side {
    /// Represents a position that profits when the underlying asset's price increases.
    #[default]
    Long,
    /// Represents a position that profits when the underlying asset's price decreases.
    Short,
}

/// Specifies the style of an option contract: call or put.
///
/// `OptionStyle` is a critical attribute for options contracts as it directly
/// affects valuation, pricing models, and exercise strategies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, Ord, PartialOrd, ToSchema,
)]
pub enum OptionStyle {
    /// The right (but not obligation) to buy the underlying at the strike price.
    #[default]
    Call,
    /// The right (but not obligation) to sell the underlying at the strike price.
    Put,
}

impl std::fmt::Display for OptionStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionStyle::Call => write!(f, "C"),
            OptionStyle::Put => write!(f, "P"),
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "Long"),
            Side::Short => write!(f, "Short"),
        }
    }
}
