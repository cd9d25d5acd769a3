mod address;
mod dr6;
mod dr7;

pub use self::{
    address::{Dr0, Dr1, Dr2, Dr3},
    dr6::Dr6,
    dr7::{BreakpointCondition, BreakpointLength, Dr7},
};
