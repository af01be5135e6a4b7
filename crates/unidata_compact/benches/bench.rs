use criterion::{criterion_main, criterion_group, Criterion};

use std::rc::Rc;
use unidata_compact::{pack, Field, FlagBits, RecordSet, StringTable};

/// Records shaped like a real database: shared range values and a unique name per assigned codepoint
fn sample_records() -> RecordSet {
    let mut records = RecordSet::new();
    let blocks = (0..32).map(|idx| Rc::<str>::from(format!("Block {idx}"))).collect::<Vec<_>>();
    let ages = (1..16).map(|ver| Rc::<str>::from(format!("Unicode {ver}.0"))).collect::<Vec<_>>();
    let letter: Rc<str> = Rc::from("Other Letter (Lo)");

    for cp in 0..0x8000u32 {
        records.set(cp, Field::Name, Rc::from(format!("CHARACTER {cp:04X}")));
        records.set(cp, Field::GeneralCategory, letter.clone());
        records.set(cp, Field::Block, blocks[(cp >> 10) as usize].clone());
        records.set(cp, Field::Age, ages[cp as usize % ages.len()].clone());
        if cp % 7 == 0 {
            records.enable_flag(cp, FlagBits::AnyMark);
        }
    }
    records
}

fn table_benchmark(c: &mut Criterion) {
    let records = sample_records();
    c.bench_function("string table: 32k codepoints", |b| b.iter(|| {
        StringTable::build(&records, &Field::ALL).map(|table| table.len())
    }));
}

fn pack_benchmark(c: &mut Criterion) {
    let records = sample_records();
    c.bench_function("pack: all codepoints", |b| b.iter(|| {
        pack(&records).units().len()
    }));
}

criterion_group!(benches, table_benchmark, pack_benchmark);
criterion_main!(benches);
