// Telemetry decoding for the controller's query history stream
//
// Provides:
// - Tokenizer and frame parser (H/L integer groups, G string group)
// - Frame assembler holding partial frames across ticks
// - Router from decoded records to registered output sinks

pub mod parser;
pub mod router;

pub use parser::{
    tokenize, DecodedGroup, Delimiters, FrameAssembler, FrameParser, ParseOutput, Reading,
    TelemetryDiagnostic, Token,
};
pub use router::{route, route_all, RouteReport, TelemetrySink};
