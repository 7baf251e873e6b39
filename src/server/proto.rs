//! Wire messages and the generated `calculator.v1.Calculator` stubs.
//!
//! The messages are plain prost structs; `build.rs` generates the tonic
//! client and server from a manual service definition that refers to them.

/// Request for `TimesTen`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct TimesTenRequest {
    #[prost(int32, tag = "1")]
    pub number: i32,
}

/// Response for `TimesTen`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct TimesTenResponse {
    #[prost(int32, tag = "1")]
    pub result: i32,
}

/// Request for `Decompose`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct DecomposeRequest {
    #[prost(int32, tag = "1")]
    pub number: i32,
}

/// One prime factor streamed back by `Decompose`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct DecomposeResponse {
    #[prost(int32, tag = "1")]
    pub factor: i32,
}

/// One number streamed to `ComputeAverage`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct ComputeAverageRequest {
    #[prost(float, tag = "1")]
    pub number: f32,
}

/// Response for `ComputeAverage`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct ComputeAverageResponse {
    #[prost(float, tag = "1")]
    pub average: f32,
}

/// One number streamed to `FindMaximum`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct FindMaximumRequest {
    #[prost(int32, tag = "1")]
    pub number: i32,
}

/// A new running maximum streamed back by `FindMaximum`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct FindMaximumResponse {
    #[prost(int32, tag = "1")]
    pub number: i32,
}

/// Request for `CalculateWithDeadline`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct CalculateWithDeadlineRequest {
    #[prost(int32, tag = "1")]
    pub a: i32,
    #[prost(int32, tag = "2")]
    pub b: i32,
}

/// Response for `CalculateWithDeadline`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct CalculateWithDeadlineResponse {
    #[prost(int32, tag = "1")]
    pub result: i32,
}

include!(concat!(env!("OUT_DIR"), "/calculator.v1.Calculator.rs"));
