pub mod aggregate;
pub mod errors;
pub mod series;
pub mod synth;
pub mod table;

pub use crate::{
    aggregate::{aggregate, AggregatePoint, Aggregation, Diagnostic, WindowOrigin, WindowedAggregator},
    errors::{Error, ErrorKind, Result},
    series::TimeSeries,
    synth::{generate, Campaign, SeriesSynthesizer, Shape, ToolProfile},
    table::{Observation, Table},
};
