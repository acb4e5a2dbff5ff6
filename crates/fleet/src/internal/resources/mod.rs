pub mod description;
mod matching;

pub use description::{
    ComputingUnits, Processor, ProcessorList, ProcessorProperty, ProcessorType,
    ResourceDescription,
};
