//! Routing hot-path benchmarks.
//!
//! Measures inbound gating and outbound delivery on a single bridge with an
//! in-memory client channel.
//!
//! Run with: cargo bench --bench routing
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;

use devtools_bridge::protocol::{InboundMessage, OutboundMessage};
use devtools_bridge::{
    BridgeConfig, ClientChannel, ConnectionId, MiddlewareRegistry, ReadyState, RequestId, Result,
    SessionBridge, SessionId,
};

// ============================================================================
// Fixtures
// ============================================================================

/// Client channel that discards every frame.
struct NullClient;

impl ClientChannel for NullClient {
    fn ready_state(&self) -> ReadyState {
        ReadyState::Open
    }

    fn send_text(&self, text: String) -> Result<()> {
        black_box(text);
        Ok(())
    }

    fn close(&self) {}
}

fn bridge() -> SessionBridge {
    let mut registry = MiddlewareRegistry::new();
    registry.register("Page", "getTree", |result, _| json!({ "frameTree": result }));

    let mut bridge = SessionBridge::new(
        SessionId::generate(),
        &BridgeConfig::default(),
        Arc::new(registry),
    );
    bridge.on_client_connect(ConnectionId::next(), Arc::new(NullClient));
    bridge.enable_domains(["Network", "Page"]);
    bridge
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_inbound(c: &mut Criterion) {
    let mut group = c.benchmark_group("inbound");
    let mut bridge = bridge();

    let forwarded = InboundMessage::new(1u64, "Network.getResponseBody")
        .with_params(json!({ "requestId": "1000.1" }));
    let dropped = InboundMessage::new(2u64, "Debugger.resume");

    group.bench_function("forwarded", |b| {
        b.iter(|| bridge.handle_inbound(black_box(forwarded.clone())))
    });
    group.bench_function("dropped", |b| {
        b.iter(|| bridge.handle_inbound(black_box(dropped.clone())))
    });

    group.finish();
}

fn bench_outbound(c: &mut Criterion) {
    let mut group = c.benchmark_group("outbound");
    let bridge = bridge();

    let plain = OutboundMessage::new(Some(RequestId::new(3)), json!({ "body": "x".repeat(256) }));
    let routed = OutboundMessage::new(Some(RequestId::new(4)), json!({ "root": { "id": 1 } }))
        .with_route("Page", "getTree");

    group.bench_function("plain", |b| {
        b.iter(|| bridge.send_to_client(black_box(plain.clone())))
    });
    group.bench_function("transformed", |b| {
        b.iter(|| bridge.send_to_client(black_box(routed.clone())))
    });

    group.finish();
}

criterion_group!(benches, bench_inbound, bench_outbound);
criterion_main!(benches);
