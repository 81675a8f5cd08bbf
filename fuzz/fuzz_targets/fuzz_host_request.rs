//! Fuzz target: `HostRequest` decoding and routing
//!
//! Decodes arbitrary bytes as a postcard `HostRequest` and hands it to a
//! host built from every controller layout. Routing may fail but must
//! never panic.
//!
//! cargo fuzz run fuzz_host_request

#![no_main]

use libfuzzer_sys::fuzz_target;
use rigmodules::app::commands::HostRequest;
use rigmodules::app::host::ModuleHost;
use rigmodules::config::{ControllerLayout, ControllerTarget};
use rigmodules::sensors::quadrature::QuadratureDecoder;

static DECODER: QuadratureDecoder = QuadratureDecoder::new();

fuzz_target!(|data: &[u8]| {
    let Ok(request) = postcard::from_bytes::<HostRequest>(data) else {
        return;
    };
    for target in [ControllerTarget::Actor, ControllerTarget::Sensor, ControllerTarget::Encoder] {
        let Ok(mut host) = ModuleHost::from_layout(&ControllerLayout::for_target(target), || &DECODER)
        else {
            continue;
        };
        let _ = host.handle(&request, 0);
        // A second request against the same address must not panic either.
        let _ = host.handle(&request, 1);
    }
});
