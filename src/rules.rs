//! The majority-inverter graph axioms used during saturation.
use once_cell::sync::Lazy;

use crate::{rewrite, Rewrite};

/// Every rule the compiler saturates with, in application order.
///
/// There are no commutativity rules: majority enodes keep their
/// children sorted, and `maj` patterns match any permutation.
pub static REWRITE_RULES: Lazy<Vec<Rewrite>> = Lazy::new(|| {
    let mut rules = vec![
        rewrite!("not_not"; "(! (! ?a))" => "?a"),
        rewrite!("maj_1"; "(maj ?a ?a ?b)" => "?a"),
        rewrite!("maj_2"; "(maj ?a (! ?a) ?b)" => "?b"),
        rewrite!("associativity"; "(maj ?a ?b (maj ?c ?b ?d))" => "(maj ?d ?b (maj ?c ?b ?a))"),
    ];
    rules.extend(rewrite!("invert"; "(! (maj ?a ?b ?c))" <=> "(maj (! ?a) (! ?b) (! ?c))"));
    rules.extend(rewrite!(
        "distributivity";
        "(maj ?a ?b (maj ?c ?d ?e))" <=> "(maj (maj ?a ?b ?c) (maj ?a ?b ?d) ?e)"
    ));
    rules
});
