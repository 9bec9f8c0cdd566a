use criterion::*;
use ethosu_core::{driver_client::*, ethosu::*};
use std::sync::Arc;

fn bench_dispatch(c: &mut Criterion) {
    let _ = env_logger::try_init();

    let cfg = DriverConfig::driver_client_cfg(NpuType::EthosU55);
    let sim = Arc::new(
        SimDevice::new(&cfg)
            .with_run_latency(0)
            .with_write_log(false),
    );
    let mut device = EthosuDevice::init(DriverClient::with_backend(cfg, Arc::clone(&sim)))
        .expect("init on simulator");
    device
        .bring_up(&AxiConfig::axi_cfg(AxiProfile::Default))
        .expect("bring-up on simulator");

    let invocation = CommandStreamInvocation::new(
        0x6000_0000,
        0x400,
        &[0x7000_0000, 0x7010_0000, 0x7020_0000, 0x7030_0000],
    );

    let mut group = c.benchmark_group("Command stream dispatch");
    group.bench_function("dispatch", |b| {
        b.iter(|| {
            let _ = device.dispatch(black_box(&invocation));
        })
    });
    group.bench_function("dispatch/poll/clear", |b| {
        b.iter(|| {
            let _ = device.dispatch(&invocation);
            while !device.is_irq_raised().unwrap_or(true) {}
            let _ = device.clear_irq_status();
            let _ = device.clear_irq_history_mask(0xFFFF);
        })
    });
    group.finish();

    let mut group = c.benchmark_group("Register reads");
    group.bench_function("status", |b| b.iter(|| device.get_status_mask()));
    group.bench_function("shram section", |b| b.iter(|| device.get_shram_data(black_box(0))));
    group.finish();

    assert!(sim.writes().is_empty());
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(50);
    targets = bench_dispatch
}
criterion_main!(benches);
