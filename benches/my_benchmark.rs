use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use minidb::parser::Parser;
use minidb::tokenizer::Lexer;
use minidb::{Engine, QueryResult};
use std::hint::black_box;

fn run(engine: &mut Engine, sql: &str) -> Option<QueryResult> {
    let tokens = Lexer::new(sql, 1).tokenize().unwrap();
    let statement = Parser::new(tokens).parse().unwrap().unwrap();
    engine.execute(statement).unwrap()
}

fn setup_populated_engine(n: usize) -> Engine {
    let mut engine = Engine::with_default("bench");

    run(
        &mut engine,
        "CREATE TABLE users (id INTEGER, name TEXT, age INTEGER)",
    );
    for i in 0..n {
        run(
            &mut engine,
            &format!("INSERT INTO users VALUES ({}, 'user{}', {})", i, i, i % 100),
        );
    }
    engine
}

fn bench_insert_sql(c: &mut Criterion) {
    let mut group = c.benchmark_group("Insert_SQL_Pipeline");
    group.bench_function("insert_single_row_sql", |b| {
        let mut engine = Engine::with_default("bench");
        run(&mut engine, "CREATE TABLE tests (id INTEGER)");
        b.iter(|| {
            run(&mut engine, black_box("INSERT INTO tests VALUES (42)"));
        });
    });
    group.finish();
}

fn bench_select_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Select_Where_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let mut engine = setup_populated_engine(n);
            b.iter(|| {
                let res = run(&mut engine, "SELECT * FROM users WHERE age = 42");
                black_box(res);
            });
        });
    }
    group.finish();
}

fn bench_update_performance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Update_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            b.iter_with_setup(
                || setup_populated_engine(n),
                |mut engine| {
                    run(&mut engine, "UPDATE users SET age = age + 1 WHERE age < 50");
                    black_box(engine);
                },
            );
        });
    }
    group.finish();
}

fn bench_delete_performance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Delete_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            b.iter_with_setup(
                || setup_populated_engine(n),
                |mut engine| {
                    run(&mut engine, "DELETE FROM users WHERE age > 90");
                    black_box(engine);
                },
            );
        });
    }
    group.finish();
}

fn bench_inner_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("Inner_Join_Performance");

    for n in [100, 300].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let mut engine = Engine::with_default("bench");
            run(&mut engine, "CREATE TABLE a (id INTEGER, v TEXT)");
            run(&mut engine, "CREATE TABLE b (aid INTEGER, w TEXT)");
            for i in 0..n {
                run(&mut engine, &format!("INSERT INTO a VALUES ({}, 'x')", i));
                run(
                    &mut engine,
                    &format!("INSERT INTO b VALUES ({}, 'y')", i * 2),
                );
            }
            b.iter(|| {
                let res = run(
                    &mut engine,
                    "SELECT a.id, b.w FROM a INNER JOIN b ON a.id = b.aid",
                );
                black_box(res);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert_sql,
    bench_select_scaling,
    bench_update_performance,
    bench_delete_performance,
    bench_inner_join
);
criterion_main!(benches);
