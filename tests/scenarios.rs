//! End-to-end scenario tests, run through both execution paths: the
//! bytecode compiler + VM, and the tree-walking interpreter. Both paths
//! must agree on observable stdout for every scenario.

use emberscript::Source;

fn bytecode_stdout(src: &str) -> String {
    let mut out = Vec::new();
    emberscript::run(Source::source(src), &mut out).expect("bytecode path failed");
    String::from_utf8(out).unwrap()
}

fn tree_stdout(src: &str) -> String {
    let mut out = Vec::new();
    emberscript::exec(Source::source(src), &mut out).expect("tree-walking path failed");
    String::from_utf8(out).unwrap()
}

fn assert_scenario(src: &str, expected: &str) {
    assert_eq!(bytecode_stdout(src), expected, "bytecode path mismatch for {:?}", src);
    assert_eq!(tree_stdout(src), expected, "tree-walking path mismatch for {:?}", src);
}

#[test]
fn arithmetic() {
    assert_scenario("var a: 2\nvar b: 3\nprint(a + b)\n", "5\n");
}

#[test]
fn property_mutation() {
    assert_scenario("obj: { name: \"hi\", n: 1 }\nobj.n = obj.n + 41\nprint(obj.n)\n", "42\n");
}

#[test]
fn function_call() {
    assert_scenario("add: fn(a, b) { a + b }\nprint(add(10, 32))\n", "42\n");
}

#[test]
fn naked_iterator_over_range() {
    assert_scenario("sum: 0\ni: 1..4\n  sum = sum + i\nprint(sum)\n", "10\n");
}

#[test]
fn mixin_composition() {
    let src = "Greet: { hi: fn() { print(\"hi \" + this.name) } }\np: { :[Greet], name: \"A\" }\np.hi()\n";
    assert_scenario(src, "hi A\n");
}

#[test]
fn deep_property_set() {
    assert_scenario("g: { p: {} }\ng.p.q = \"x\"\nprint(g.p.q)\n", "x\n");
}

#[test]
fn recursive_function_does_not_clobber_locals() {
    let src = "fact: fn(n) { if n <= 1 { 1 } else { n * fact(n - 1) } }\nprint(fact(5))\n";
    assert_scenario(src, "120\n");
}

#[test]
fn let_binding_rejects_reassignment_but_allows_property_mutation() {
    let src = "let obj: { n: 1 }\nobj.n = 2\nprint(obj.n)\n";
    assert_scenario(src, "2\n");
}
