use tonic_build::manual::{Builder, Method, Service};
use vergen_gitcl::{Emitter, Gitcl};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Commit and dirty flag for `version_string()`.
    let gitcl = Gitcl::builder().sha(true).dirty(true).build();
    Emitter::default().add_instructions(&gitcl)?.emit()?;

    // The message types live in `src/server/proto.rs` as hand-written prost
    // structs, so the service stubs are generated without a .proto file.
    Builder::new().compile(&[calculator_service()]);

    Ok(())
}

fn calculator_service() -> Service {
    Service::builder()
        .name("Calculator")
        .package("calculator.v1")
        .comment("Calculator service demonstrating every gRPC call shape.")
        .method(method("times_ten", "TimesTen", "TimesTen").build())
        .method(
            method("decompose", "Decompose", "Decompose")
                .server_streaming()
                .build(),
        )
        .method(
            method("compute_average", "ComputeAverage", "ComputeAverage")
                .client_streaming()
                .build(),
        )
        .method(
            method("find_maximum", "FindMaximum", "FindMaximum")
                .client_streaming()
                .server_streaming()
                .build(),
        )
        .method(
            method(
                "calculate_with_deadline",
                "CalculateWithDeadline",
                "CalculateWithDeadline",
            )
            .build(),
        )
        .build()
}

fn method(name: &str, route: &str, message: &str) -> tonic_build::manual::MethodBuilder {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::server::proto::{message}Request"))
        .output_type(format!("crate::server::proto::{message}Response"))
        .codec_path("tonic::codec::ProstCodec")
}
