#![no_main]

use libfuzzer_sys::fuzz_target;
use rust_decimal_macros::dec;
use tarif::engine::{BulkRequest, BulkResponse, PricingEngine, PricingSnapshotBuilder};
use tarif::tax::{ApplicationType, TaxGroupBuilder, TaxJurisdictionBuilder, TaxRateBuilder};
use tarif::*;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(request) = BulkRequest::from_json(s) else {
        return;
    };
    let Ok(snapshot) = PricingSnapshotBuilder::new()
        .products((1..=5).map(ProductId))
        .customer(CustomerId(1))
        .tax_rate(TaxRateBuilder::new(TaxRateId(1), dec!(19)).build())
        .tax_rate(TaxRateBuilder::new(TaxRateId(2), dec!(0.35)).fixed().build())
        .tax_group(
            TaxGroupBuilder::new(TaxGroupId(1), ApplicationType::Compound)
                .member(TaxRateId(1))
                .member_on_previous(TaxRateId(2))
                .inclusive()
                .build(),
        )
        .jurisdiction(
            TaxJurisdictionBuilder::new(JurisdictionId(1), TaxTarget::Group(TaxGroupId(1))).build(),
        )
        .build()
    else {
        return;
    };
    let Ok(engine) = PricingEngine::new(snapshot, EngineConfig::default()) else {
        return;
    };
    // Errors are fine, panics are bugs.
    let _ = BulkResponse::from_results(engine.calculate_bulk(&request.items));
});
