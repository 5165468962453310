// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tobias Sarnowski <tobias@sarnowski.cloud>

use cflat::types::TypeUsage;
use cflat::{Environment, EnvironmentConfig};

fn env() -> Environment {
    Environment::new("test.cpp", EnvironmentConfig::default())
}

fn bool_var(environment: &Environment, name: &str) -> bool {
    environment.get_variable(name).and_then(|v| v.as_bool()).unwrap_or_else(|| panic!("missing bool variable '{name}'"))
}

fn int_var(environment: &Environment, name: &str) -> i64 {
    environment.get_variable(name).and_then(|v| v.as_i64()).unwrap_or_else(|| panic!("missing int variable '{name}'"))
}

#[test]
fn precedence_of_comparison_vs_logical() {
    let environment = env();
    environment.load("const int var = 42; const bool c1 = var > 0 && var < 50; const bool c2 = var > 50 && var < 100;").expect("load");
    assert!(bool_var(&environment, "c1"));
    assert!(!bool_var(&environment, "c2"));
}

#[test]
fn short_circuit_evaluation_counts_side_effects_correctly() {
    let environment = env();
    environment
        .load("int var1 = 0; int var2 = 0; const bool c1 = var1++ && var2++; const bool c2 = var1++ || var2++;")
        .expect("load");
    assert!(!bool_var(&environment, "c1"));
    assert!(bool_var(&environment, "c2"));
    assert_eq!(int_var(&environment, "var1"), 2);
    assert_eq!(int_var(&environment, "var2"), 0);
}

#[test]
fn range_based_for_over_array() {
    let environment = env();
    environment.load("int sum = 0; int arr[] = { 1, 2, 3, 4 }; for (int x : arr) { sum += x; }").expect("load");
    assert_eq!(int_var(&environment, "sum"), 10);
}

#[test]
fn method_dispatch_across_inheritance_with_member_offset() {
    let environment = env();
    let int = TypeUsage::of(environment.builtins().int);

    let base = environment.register_type("Base", 4, 4);
    environment.add_member(base, "a", int, 0);

    let derived = environment.register_type("Derived", 8, 4);
    environment.add_base(derived, base, 0);
    environment.add_member(derived, "b", int, 4);

    environment.load("Derived d; d.a = 7; d.b = 11; Base* p = static_cast<Base*>(&d); int v = p->a;").expect("load");
    assert_eq!(int_var(&environment, "v"), 7);
}

#[test]
fn null_pointer_access_produces_runtime_error() {
    let environment = env();
    environment.register_type("Foo", 4, 4);
    let err = environment.load("Foo* p = nullptr; p->method();").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("null pointer access ('method')"), "unexpected message: {message}");
    assert_eq!(environment.error_message().as_deref(), Some(message.as_str()));
}

#[test]
fn switch_fall_through_and_default() {
    let environment = env();
    environment.load("int v = 42; switch (v) { case 0: v += 10; case 42: v += 100; case 100: v += 1000; }").expect("load");
    assert_eq!(int_var(&environment, "v"), 1142);
}

#[test]
fn reloading_an_idempotent_program_leaves_variables_unchanged() {
    let environment = env();
    environment.load("int x = 5; int y = x * 2;").expect("first load");
    assert_eq!(int_var(&environment, "y"), 10);
    environment.load("int x = 5; int y = x * 2;").expect("second load");
    assert_eq!(int_var(&environment, "y"), 10);
}

#[test]
fn using_directive_brings_a_namespaced_function_into_scope() {
    let environment = env();
    environment
        .load("namespace math { int square(int n) { return n * n; } } using namespace math; int result = square(6);")
        .expect("load");
    assert_eq!(int_var(&environment, "result"), 36);
}

#[test]
fn overload_resolution_picks_the_exact_parameter_match() {
    let environment = env();
    environment
        .load(
            "int pick(int n) { return 1; } int pick(double n) { return 2; } int a = pick(3); int b = pick(3.5);",
        )
        .expect("load");
    assert_eq!(int_var(&environment, "a"), 1);
    assert_eq!(int_var(&environment, "b"), 2);
}

#[test]
fn get_variable_reads_the_same_value_set_variable_writes() {
    let environment = env();
    environment.load("int counter = 0;").expect("load");
    let int = TypeUsage::of(environment.builtins().int);
    let mut value = cflat::Value::from_heap_bytes(int, vec![0; 4]);
    value.set_from_i64(99);
    environment.set_variable("counter", &value).expect("set_variable");
    assert_eq!(int_var(&environment, "counter"), 99);
}
