use crate::env::{GlobalRef, TypingFlags};
use crate::inductive::packet::ctor_tags;
use crate::inductive::rtree::RecArg;
use crate::inductive::unit_shape::{combine_conditions, is_unit, UnitCondition};
use crate::inductive::{
    Anomaly, ConstructorTag, CtorDefect, Finite, IndArity, IndError, OneInductiveEntry, SquashInfo, UniverseEntry,
};
use crate::level::{Sort, SortFamily};
use crate::tests::util::{block, random_name, test_fixture, test_fixture_with};
use crate::univ::ConstraintKind;
use rand::prelude::*;
use std::error::Error;

fn squash_of(arity: &IndArity) -> Option<SquashInfo> { arity.squash().cloned() }

#[test]
fn nat_packet() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let body = fx.declare_nat()?;
        assert_eq!(body.ntypes, 1);
        assert_eq!(body.nparams, 0);
        assert_eq!(body.nparams_rec, 0);
        assert_eq!(body.finite, Finite::Finite);
        assert!(body.record.is_none());
        let nat = &body.packets[0];
        assert_eq!(nat.consnames.len(), 2);
        assert_eq!(nat.kelim, SortFamily::InType);
        assert_eq!(squash_of(&nat.arity), Some(SquashInfo::NoSquash));
        assert_eq!(nat.arity.sort(), fx.ctx.set_sort());
        assert_eq!(nat.consnrealargs, vec![0, 1]);
        assert_eq!(nat.ctor_tags, vec![ConstructorTag::Constant(0), ConstructorTag::Block { tag: 1, arity: 1 }]);
        assert_eq!((nat.nb_constant, nat.nb_args), (1, 1));

        let subterms = nat.recargs.dest_subterms().ok_or("nat has no rec-tree node")?;
        assert!(subterms[0].is_empty());
        assert_eq!(subterms[1].len(), 1);
        assert_eq!(subterms[1][0].dest_recarg(), Some(RecArg::Mrec(body.ind_ref(0))));

        let ind = fx.global("nat");
        let succ_ty = fx.pi("n", ind, ind);
        assert_eq!(nat.user_lc[1], succ_ty);
        Ok(())
    })
}

#[test]
fn list_packet() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let body = fx.declare_list()?;
        assert_eq!(body.nparams, 1);
        assert_eq!(body.nparams_rec, 1);
        let list = &body.packets[0];
        assert_eq!(list.kelim, SortFamily::InType);
        assert_eq!(list.consnrealargs, vec![0, 2]);
        assert_eq!(list.consnrealdecls, vec![0, 2]);
        assert!(list.user_lc.iter().all(|c| fx.ctx.closed(*c)));

        let subterms = list.recargs.dest_subterms().ok_or("list has no rec-tree node")?;
        assert_eq!(subterms[1].len(), 2);
        assert!(!subterms[1][0].is_recursive());
        assert_eq!(subterms[1][1].dest_recarg(), Some(RecArg::Mrec(body.ind_ref(0))));

        // The block's universe joins the global graph once registered.
        let u = fx.n("list.u");
        assert!(fx.env.ugraph().contains(u));
        Ok(())
    })
}

#[test]
fn tree_forest_packets() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let entry = fx.tree_forest();
        let body = fx.declare("tree", &entry)?;
        assert_eq!(body.ntypes, 2);
        assert_eq!(body.nparams_rec, 1);
        let (tree, forest) = (body.ind_ref(0), body.ind_ref(1));

        let node = body.packets[0].recargs.dest_subterms().ok_or("tree has no rec-tree node")?;
        assert_eq!(node[0][0].dest_recarg(), Some(RecArg::Norec));
        assert_eq!(node[0][1].dest_recarg(), Some(RecArg::Mrec(forest)));

        let forest_ctors = body.packets[1].recargs.dest_subterms().ok_or("forest has no rec-tree node")?;
        assert!(forest_ctors[0].is_empty());
        assert_eq!(forest_ctors[1][0].dest_recarg(), Some(RecArg::Mrec(tree)));
        assert_eq!(forest_ctors[1][1].dest_recarg(), Some(RecArg::Mrec(forest)));

        let fcons = fx.n("fcons");
        assert_eq!(fx.env.resolve_global(fcons), Some(GlobalRef::Construct(forest, 1)));
        Ok(())
    })
}

/// Two inductives of one block whose parameters differ in count, type or order.
#[test]
fn non_uniform_params_random() -> Result<(), Box<dyn Error>> {
    let mut rng = thread_rng();
    for _ in 0..40 {
        test_fixture(|fx| {
            let first_name = format!("{}0", random_name(&mut rng, 8));
            let second_name = format!("{}1", random_name(&mut rng, 8));
            let (set, prop, type1) = (fx.set(), fx.prop(), fx.type_n(1));
            let a = fx.assum("A", set);
            let p = fx.assum("P", prop);
            let a_big = fx.assum("A", type1);
            let (first, second) = match rng.gen_range(0..3) {
                0 => (vec![a], vec![a, p]),
                1 => (vec![a], vec![a_big]),
                _ => (vec![a, p], vec![p, a]),
            };
            let one = fx.one(&first_name, &first, set, vec![]);
            let two = fx.one(&second_name, &second, set, vec![]);
            let expected = IndError::NonUniformParams { ind: fx.n(&second_name) };
            assert_eq!(fx.check(&first_name, &block(vec![one, two])).err(), Some(expected));
            Ok(())
        })?;
    }
    Ok(())
}

#[test]
fn non_uniform_params_before_positivity() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        fx.declare_false()?;
        let (set, prop) = (fx.set(), fx.prop());
        let a = fx.assum("A", set);
        // `neg (A : Set) : Prop := mk_neg : (neg A -> False) -> neg A`
        let (r0, falsity) = (fx.rel(0), fx.global("False"));
        let neg_a = fx.rel_app(2, &[r0]);
        let arrow = fx.pi("", neg_a, falsity);
        let r1 = fx.rel(1);
        let concl = fx.rel_app(3, &[r1]);
        let mk = fx.pi("f", arrow, concl);
        let neg = fx.one("neg", &[a], prop, vec![("mk_neg", mk)]);
        let other = fx.one("other", &[], prop, vec![]);
        let expected = IndError::NonUniformParams { ind: fx.n("other") };
        assert_eq!(fx.check("neg", &block(vec![neg, other])).err(), Some(expected));
        Ok(())
    })
}

#[test]
fn negative_occurrence() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        fx.declare_false()?;
        let prop = fx.prop();
        // `bad : Prop := mk : (bad -> False) -> bad`
        let (r0, falsity) = (fx.rel(0), fx.global("False"));
        let arrow = fx.pi("", r0, falsity);
        let r1 = fx.rel(1);
        let mk = fx.pi("f", arrow, r1);
        let bad = fx.one("bad", &[], prop, vec![("mk", mk)]);
        let expected = IndError::IllFormedConstructor {
            ind: fx.n("bad"),
            cstr: fx.n("mk"),
            arg: 0,
            defect: CtorDefect::NonPos(fx.n("bad")),
        };
        assert_eq!(fx.check("bad", &block(vec![bad])).err(), Some(expected));
        Ok(())
    })
}

#[test]
fn negative_occurrence_of_sibling() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        fx.declare_false()?;
        let set = fx.set();
        // `ev : Set := ev_mk : (od -> False) -> ev` and `od : Set := od_mk : ev -> od`
        let (r0, falsity) = (fx.rel(0), fx.global("False"));
        let arrow = fx.pi("", r0, falsity);
        let r2 = fx.rel(2);
        let ev_mk = fx.pi("f", arrow, r2);
        let r1 = fx.rel(1);
        let od_mk = fx.pi("e", r1, r1);
        let ev = fx.one("ev", &[], set, vec![("ev_mk", ev_mk)]);
        let od = fx.one("od", &[], set, vec![("od_mk", od_mk)]);
        let expected = IndError::IllFormedConstructor {
            ind: fx.n("ev"),
            cstr: fx.n("ev_mk"),
            arg: 0,
            defect: CtorDefect::NonPos(fx.n("od")),
        };
        assert_eq!(fx.check("ev", &block(vec![ev, od])).err(), Some(expected));
        Ok(())
    })
}

/// `alt (A B : Set) : Set := c : A -> alt B A -> alt A B` has no recursive parameter.
#[test]
fn swapped_recursive_params() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let set = fx.set();
        let (a, b) = (fx.assum("A", set), fx.assum("B", set));
        let (r1, r2) = (fx.rel(1), fx.rel(2));
        let swapped = fx.rel_app(3, &[r1, r2]);
        let r3 = fx.rel(3);
        let concl = fx.rel_app(4, &[r3, r2]);
        let inner = fx.pi("y", swapped, concl);
        let c = fx.pi("x", r1, inner);
        let alt = fx.one("alt", &[a, b], set, vec![("alt_c", c)]);
        let body = fx.declare("alt", &block(vec![alt]))?;
        assert_eq!(body.nparams, 2);
        assert_eq!(body.nparams_rec, 0);
        let ctors = body.packets[0].recargs.dest_subterms().ok_or("alt has no rec-tree node")?;
        assert_eq!(ctors[0][1].dest_recarg(), Some(RecArg::Mrec(body.ind_ref(0))));
        Ok(())
    })
}

/// `two (A B : Set) : Set := c : two A A -> two A B` keeps its first parameter recursive.
#[test]
fn partially_uniform_params() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let set = fx.set();
        let (a, b) = (fx.assum("A", set), fx.assum("B", set));
        let r1 = fx.rel(1);
        let rec = fx.rel_app(2, &[r1, r1]);
        let (r2, r1) = (fx.rel(2), fx.rel(1));
        let concl = fx.rel_app(3, &[r2, r1]);
        let c = fx.pi("y", rec, concl);
        let two = fx.one("two", &[a, b], set, vec![("two_c", c)]);
        let body = fx.declare("two", &block(vec![two]))?;
        assert_eq!(body.nparams_rec, 1);
        Ok(())
    })
}

/// `lp (A : Set) (B : Set := A) (C : Set) : Set := lp_c : B -> lp A C -> lp A C`
/// The let-bound `B` is skipped when applying `lp`, and does not count as a parameter.
#[test]
fn let_bound_parameter() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let set = fx.set();
        let a = fx.assum("A", set);
        let r0 = fx.rel(0);
        let b = fx.def("B", set, r0);
        let c = fx.assum("C", set);
        let (r1, r3) = (fx.rel(1), fx.rel(3));
        let rec = fx.rel_app(4, &[r3, r1]);
        let (r2, r4) = (fx.rel(2), fx.rel(4));
        let concl = fx.rel_app(5, &[r4, r2]);
        let inner = fx.pi("t", rec, concl);
        let lp_c = fx.pi("x", r1, inner);
        let lp = fx.one("lp", &[a, b, c], set, vec![("lp_c", lp_c)]);
        let body = fx.declare("lp", &block(vec![lp]))?;
        assert_eq!(body.params.len(), 3);
        assert_eq!(body.nparams, 2);
        assert_eq!(body.nparams_rec, 2);
        assert_eq!(body.packets[0].consnrealargs, vec![2]);

        // `lq_c : lq A A -> lq A C` keeps only `A` recursive.
        let r0 = fx.rel(0);
        let b = fx.def("B", set, r0);
        let (r1, r2, r3) = (fx.rel(1), fx.rel(2), fx.rel(3));
        let rec = fx.rel_app(3, &[r2, r2]);
        let concl = fx.rel_app(4, &[r3, r1]);
        let lq_c = fx.pi("t", rec, concl);
        let lq = fx.one("lq", &[a, b, c], set, vec![("lq_c", lq_c)]);
        let body = fx.check("lq", &block(vec![lq]))?;
        assert_eq!(body.nparams, 2);
        assert_eq!(body.nparams_rec, 1);
        Ok(())
    })
}

/// `even (A : Set)` and `odd (B : Set)`: only the binder names differ.
#[test]
fn renamed_params_are_uniform() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let set = fx.set();
        let (a, b) = (fx.assum("A", set), fx.assum("B", set));
        let (r0, r1) = (fx.rel(0), fx.rel(1));
        let even_z = fx.rel_app(2, &[r0]);
        let (even_a, odd_a) = (fx.rel_app(2, &[r0]), fx.rel_app(1, &[r0]));
        let even_concl = fx.rel_app(3, &[r1]);
        let even_s = fx.pi("o", odd_a, even_concl);
        let odd_concl = fx.rel_app(2, &[r1]);
        let odd_s = fx.pi("e", even_a, odd_concl);
        let even = fx.one("even", &[a], set, vec![("even_z", even_z), ("even_s", even_s)]);
        let odd = fx.one("odd", &[b], set, vec![("odd_s", odd_s)]);
        let body = fx.declare("even", &block(vec![even, odd]))?;
        assert_eq!(body.nparams, 1);
        assert_eq!(body.nparams_rec, 1);
        assert_eq!(body.params[0].name(), fx.n("A"));

        // A different type is still rejected.
        let prop = fx.prop();
        let p = fx.assum("B", prop);
        let r0 = fx.rel(0);
        let c1 = fx.rel_app(2, &[r0]);
        let c2 = fx.rel_app(1, &[r0]);
        let one = fx.one("e2", &[a], set, vec![("e2_c", c1)]);
        let two = fx.one("o2", &[p], set, vec![("o2_c", c2)]);
        let expected = IndError::NonUniformParams { ind: fx.n("o2") };
        assert_eq!(fx.check("e2", &block(vec![one, two])).err(), Some(expected));
        Ok(())
    })
}

/// `Acc (A : Type) (R : A -> A -> Prop) (x : A) : Prop :=
///    Acc_intro : (forall y, R y x -> Acc A R y) -> Acc A R x`
#[test]
fn accessibility() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let u = fx.n("Acc.u");
        let (ty, prop) = (fx.type_u("Acc.u"), fx.prop());
        let a = fx.assum("A", ty);
        let (r0, r1) = (fx.rel(0), fx.rel(1));
        let rel_body = fx.pi("b", r1, prop);
        let rel_ty = fx.pi("a", r0, rel_body);
        let r = fx.assum("R", rel_ty);
        let x = fx.assum("x", r1);

        // Under `y`: A = 3, R = 2, x = 1, y = 0; under `H` everything shifts by one.
        let (r0, r1, r2, r3, r4) = (fx.rel(0), fx.rel(1), fx.rel(2), fx.rel(3), fx.rel(4));
        let r_y_x = fx.rel_app(2, &[r0, r1]);
        let acc_y = fx.rel_app(5, &[r4, r3, r1]);
        let hyp_body = fx.pi("H", r_y_x, acc_y);
        let hyp = fx.pi("y", r2, hyp_body);
        let concl = fx.rel_app(4, &[r3, r2, r1]);
        let intro = fx.pi("h", hyp, concl);

        let acc = fx.one("Acc", &[a, r, x], prop, vec![("Acc_intro", intro)]);
        let mut entry = block(vec![acc]);
        entry.universes = UniverseEntry::Monomorphic { levels: vec![u], constraints: Vec::new() };
        let body = fx.declare("Acc", &entry)?;
        assert_eq!(body.nparams, 3);
        assert_eq!(body.nparams_rec, 2);
        let packet = &body.packets[0];
        match &packet.arity {
            IndArity::Regular { squash: SquashInfo::ConditionalSquash(tys), sort: Sort::Prop, .. } =>
                assert_eq!(tys.len(), 1),
            other => panic!("unexpected arity {:?}", other),
        }
        assert_eq!(packet.kelim, SortFamily::InType);
        let ctors = packet.recargs.dest_subterms().ok_or("Acc has no rec-tree node")?;
        assert_eq!(ctors[0][0].dest_recarg(), Some(RecArg::Mrec(body.ind_ref(0))));
        Ok(())
    })
}

/// `eq (A : Type) (x : A) : A -> Prop := eq_refl : eq A x x`
#[test]
fn equality_is_unrestricted() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let u = fx.n("eq.u");
        let (ty, prop) = (fx.type_u("eq.u"), fx.prop());
        let a = fx.assum("A", ty);
        let r0 = fx.rel(0);
        let x = fx.assum("x", r0);
        let r1 = fx.rel(1);
        let arity = fx.pi("", r1, prop);
        let refl = fx.rel_app(2, &[r1, r0, r0]);
        let eq = fx.one("eq", &[a, x], arity, vec![("eq_refl", refl)]);
        let mut entry = block(vec![eq]);
        entry.universes = UniverseEntry::Monomorphic { levels: vec![u], constraints: Vec::new() };
        let body = fx.declare("eq", &entry)?;
        let packet = &body.packets[0];
        assert_eq!(squash_of(&packet.arity), Some(SquashInfo::NoSquash));
        assert_eq!(packet.kelim, SortFamily::InType);
        assert_eq!((packet.nrealargs, packet.nrealdecls), (1, 1));
        assert_eq!(packet.ctor_tags, vec![ConstructorTag::Constant(0)]);
        Ok(())
    })
}

/// `ex (A : Type) (P : A -> Prop) : Prop := ex_intro : forall x, P x -> ex A P`
#[test]
fn existential_is_squashed() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let u = fx.n("ex.u");
        let (ty, prop) = (fx.type_u("ex.u"), fx.prop());
        let a = fx.assum("A", ty);
        let r0 = fx.rel(0);
        let pred_ty = fx.pi("", r0, prop);
        let p = fx.assum("P", pred_ty);
        let (r0, r1) = (fx.rel(0), fx.rel(1));
        let p_x = fx.rel_app(1, &[r0]);
        let (r3, r2) = (fx.rel(3), fx.rel(2));
        let concl = fx.rel_app(4, &[r3, r2]);
        let inner = fx.pi("h", p_x, concl);
        let intro = fx.pi("x", r1, inner);
        let ex = fx.one("ex", &[a, p], prop, vec![("ex_intro", intro)]);
        let mut entry = block(vec![ex]);
        entry.universes = UniverseEntry::Monomorphic { levels: vec![u], constraints: Vec::new() };
        let body = fx.declare("ex", &entry)?;
        let packet = &body.packets[0];
        assert_eq!(squash_of(&packet.arity), Some(SquashInfo::PropSquash));
        assert_eq!(packet.kelim, SortFamily::InProp);
        Ok(())
    })
}

/// `or (A B : Prop) : Prop := or_introl : A -> or A B | or_intror : B -> or A B`
#[test]
fn two_constructors_in_prop_are_squashed() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let prop = fx.prop();
        let (a, b) = (fx.assum("A", prop), fx.assum("B", prop));
        let (r0, r1, r2) = (fx.rel(0), fx.rel(1), fx.rel(2));
        let concl = fx.rel_app(3, &[r2, r1]);
        let inl = fx.pi("a", r1, concl);
        let inr = fx.pi("b", r0, concl);
        let or = fx.one("or", &[a, b], prop, vec![("or_introl", inl), ("or_intror", inr)]);
        let body = fx.declare("or", &block(vec![or]))?;
        let packet = &body.packets[0];
        assert_eq!(squash_of(&packet.arity), Some(SquashInfo::PropSquash));
        assert_eq!(packet.kelim, SortFamily::InProp);
        Ok(())
    })
}

/// `and (A B : Prop) : Prop := conj : A -> B -> and A B`
#[test]
fn conjunction_is_conditionally_unrestricted() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let prop = fx.prop();
        let (a, b) = (fx.assum("A", prop), fx.assum("B", prop));
        let (r1, r2, r3) = (fx.rel(1), fx.rel(2), fx.rel(3));
        let concl = fx.rel_app(4, &[r3, r2]);
        let inner = fx.pi("b", r1, concl);
        let conj = fx.pi("a", r1, inner);
        let and = fx.one("and", &[a, b], prop, vec![("conj", conj)]);
        let mut entry = block(vec![and]);
        entry.record = Some(fx.n("and"));
        let body = fx.declare("and", &entry)?;
        let packet = &body.packets[0];
        match &packet.arity {
            IndArity::Regular { squash: SquashInfo::ConditionalSquash(tys), .. } => assert_eq!(tys.len(), 2),
            other => panic!("unexpected arity {:?}", other),
        }
        assert_eq!(packet.kelim, SortFamily::InType);
        // Only unrestricted blocks get projections.
        assert!(body.record.is_none());
        Ok(())
    })
}

#[test]
fn prop_with_data_field() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        fx.declare_nat()?;
        let (prop, nat) = (fx.prop(), fx.global("nat"));
        let r1 = fx.rel(1);
        let mk = fx.pi("n", nat, r1);
        let pn = fx.one("pnat", &[], prop, vec![("mk_pnat", mk)]);
        let body = fx.declare("pnat", &block(vec![pn]))?;
        assert_eq!(squash_of(&body.packets[0].arity), Some(SquashInfo::PropSquash));
        assert_eq!(body.packets[0].kelim, SortFamily::InProp);
        Ok(())
    })
}

/// `big : Set := mk : Set -> big`
fn big_set(fx: &mut crate::tests::util::Fixture) -> crate::inductive::MutualInductiveEntry {
    let set = fx.set();
    let r1 = fx.rel(1);
    let mk = fx.pi("s", set, r1);
    let big = fx.one("big", &[], set, vec![("mk_big", mk)]);
    block(vec![big])
}

#[test]
fn predicative_set_violation() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let entry = big_set(fx);
        let expected = IndError::Anomaly(Anomaly::PredicativityViolated(fx.n("big")));
        assert_eq!(fx.check("big", &entry).err(), Some(expected));
        Ok(())
    })
}

#[test]
fn impredicative_set_squash() -> Result<(), Box<dyn Error>> {
    let flags = TypingFlags { impredicative_set: true, ..TypingFlags::default() };
    test_fixture_with(flags, |fx| {
        let entry = big_set(fx);
        let body = fx.check("big", &entry)?;
        assert_eq!(squash_of(&body.packets[0].arity), Some(SquashInfo::SetSquash));
        assert_eq!(body.packets[0].kelim, SortFamily::InSet);
        Ok(())
    })
}

#[test]
fn unchecked_universes_accept_big_set() -> Result<(), Box<dyn Error>> {
    let flags = TypingFlags { check_universes: false, ..TypingFlags::default() };
    test_fixture_with(flags, |fx| {
        let entry = big_set(fx);
        let body = fx.check("big", &entry)?;
        assert_eq!(squash_of(&body.packets[0].arity), Some(SquashInfo::NoSquash));
        Ok(())
    })
}

/// `I : nat -> Prop := c : I O`
fn indexed_prop(fx: &mut crate::tests::util::Fixture) -> Result<OneInductiveEntry, Box<dyn Error>> {
    fx.declare_nat()?;
    let (nat, prop, zero) = (fx.global("nat"), fx.prop(), fx.global("O"));
    let arity = fx.pi("n", nat, prop);
    let c = fx.rel_app(0, &[zero]);
    Ok(fx.one("I", &[], arity, vec![("I_c", c)]))
}

#[test]
fn indices_do_not_matter_by_default() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let i = indexed_prop(fx)?;
        let body = fx.check("I", &block(vec![i]))?;
        assert_eq!(squash_of(&body.packets[0].arity), Some(SquashInfo::NoSquash));
        assert_eq!(body.packets[0].nrealargs, 1);
        Ok(())
    })
}

#[test]
fn indices_matter() -> Result<(), Box<dyn Error>> {
    let flags = TypingFlags { indices_matter: true, ..TypingFlags::default() };
    test_fixture_with(flags, |fx| {
        let i = indexed_prop(fx)?;
        let body = fx.check("I", &block(vec![i]))?;
        assert_eq!(squash_of(&body.packets[0].arity), Some(SquashInfo::PropSquash));
        assert_eq!(body.packets[0].kelim, SortFamily::InProp);
        Ok(())
    })
}

/// `option (A : Type(option.u)) : Type(option.u) := None | Some (a : A)`, as a template.
#[test]
fn template_option() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        fx.declare_nat()?;
        let u = fx.n("option.u");
        let ty = fx.type_u("option.u");
        let a = fx.assum("A", ty);
        let r0 = fx.rel(0);
        let none = fx.rel_app(1, &[r0]);
        let r1 = fx.rel(1);
        let concl = fx.rel_app(2, &[r1]);
        let some = fx.pi("a", r0, concl);
        let option = fx.one("option", &[a], ty, vec![("None", none), ("Some", some)]);
        let mut entry = block(vec![option]);
        entry.template = true;
        entry.universes = UniverseEntry::Monomorphic { levels: vec![u], constraints: Vec::new() };
        let body = fx.declare("option", &entry)?;
        let ul = fx.univ("option.u");
        assert_eq!(body.packets[0].arity, IndArity::Template { param_levels: vec![Some(ul)], sort: Sort::Type(ul) });
        assert_eq!(body.packets[0].kelim, SortFamily::InType);

        let (option, nat, set) = (fx.global("option"), fx.global("nat"), fx.set());
        let option_nat = fx.app(option, &[nat]);
        assert_eq!(fx.sort_of(option_nat)?, fx.ctx.set_sort());
        let option_set = fx.app(option, &[set]);
        let one = {
            let z = fx.ctx.zero();
            fx.ctx.succ(z)
        };
        assert_eq!(fx.sort_of(option_set)?, Sort::Type(one));
        Ok(())
    })
}

/// A template type without arguments lands in `Prop`.
#[test]
fn template_prop_fallback() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let u = fx.n("tunit.u");
        let ty = fx.type_u("tunit.u");
        let tt = fx.rel(0);
        let tunit = fx.one("tunit", &[], ty, vec![("tt", tt)]);
        let mut entry = block(vec![tunit]);
        entry.template = true;
        entry.universes = UniverseEntry::Monomorphic { levels: vec![u], constraints: Vec::new() };
        let body = fx.check("tunit", &entry)?;
        assert_eq!(body.packets[0].arity, IndArity::Template { param_levels: Vec::new(), sort: Sort::Prop });
        Ok(())
    })
}

/// `inc (A : Type(inc.u)) : Type(inc.v) := mk : A -> inc A`, with `inc.u` and `inc.v`
/// unrelated.
fn unrelated_levels(fx: &mut crate::tests::util::Fixture, template: bool) -> crate::inductive::MutualInductiveEntry {
    let (u, v) = (fx.n("inc.u"), fx.n("inc.v"));
    let (tu, tv) = (fx.type_u("inc.u"), fx.type_u("inc.v"));
    let a = fx.assum("A", tu);
    let (r0, r1) = (fx.rel(0), fx.rel(1));
    let concl = fx.rel_app(2, &[r1]);
    let mk = fx.pi("a", r0, concl);
    let inc = fx.one("inc", &[a], tv, vec![("mk_inc", mk)]);
    let mut entry = block(vec![inc]);
    entry.template = template;
    entry.universes = UniverseEntry::Monomorphic { levels: vec![u, v], constraints: Vec::new() };
    entry
}

#[test]
fn template_incompatible_sort() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let entry = unrelated_levels(fx, true);
        assert_eq!(fx.check("inc", &entry).err(), Some(IndError::IncompatibleSort { ind: fx.n("inc") }));
        Ok(())
    })
}

#[test]
fn regular_level_too_small() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let entry = unrelated_levels(fx, false);
        let expected = IndError::Anomaly(Anomaly::PredicativityViolated(fx.n("inc")));
        assert_eq!(fx.check("inc", &entry).err(), Some(expected));
        Ok(())
    })
}

#[test]
fn constrained_levels_are_compatible() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let mut entry = unrelated_levels(fx, false);
        let c = fx.constraint("inc.u", ConstraintKind::Le, "inc.v");
        if let UniverseEntry::Monomorphic { constraints, .. } = &mut entry.universes {
            constraints.push(c);
        }
        let body = fx.check("inc", &entry)?;
        assert_eq!(squash_of(&body.packets[0].arity), Some(SquashInfo::NoSquash));
        Ok(())
    })
}

#[test]
fn template_on_polymorphic_block() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let mut entry = unrelated_levels(fx, true);
        let (u, v) = (fx.n("inc.u"), fx.n("inc.v"));
        entry.universes = UniverseEntry::Polymorphic { params: vec![u, v], constraints: Vec::new() };
        assert_eq!(fx.check("inc", &entry).err(), Some(IndError::Anomaly(Anomaly::TemplatePolymorphic)));
        Ok(())
    })
}

/// `pbox@{u} (A : Type(u)) : Type(u) := pmk : A -> pbox A`
#[test]
fn polymorphic_instances() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let u = fx.n("pbox.u");
        let ty = fx.type_u("pbox.u");
        let a = fx.assum("A", ty);
        let (r0, r1) = (fx.rel(0), fx.rel(1));
        let concl = fx.rel_app(2, &[r1]);
        let pmk = fx.pi("a", r0, concl);
        let pbox = fx.one("pbox", &[a], ty, vec![("pmk", pmk)]);
        let mut entry = block(vec![pbox]);
        entry.universes = UniverseEntry::Polymorphic { params: vec![u], constraints: Vec::new() };
        let body = fx.declare("pbox", &entry)?;
        assert!(body.polymorphic);
        assert!(!fx.env.ugraph().contains(u));
        let ind = body.ind_ref(0);

        let set = fx.set();
        let at_set = {
            let z = fx.ctx.zero();
            fx.ctx.alloc_levels_slice(&[z])
        };
        let expected = fx.pi("A", set, set);
        let mut tc = fx.tc();
        assert_eq!(tc.type_of_inductive(ind, at_set)?, expected);
        let none = tc.ctx().no_levels();
        assert!(tc.type_of_inductive(ind, none).is_err());
        Ok(())
    })
}

/// `cbox (A : Type(cb.b)) : Type(cb.a) := cmk : A -> cbox A` with `cb.a = cb.b`
#[test]
fn equal_levels_are_merged() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let (a_name, b_name) = (fx.n("cb.a"), fx.n("cb.b"));
        let (ta, tb) = (fx.type_u("cb.a"), fx.type_u("cb.b"));
        let a = fx.assum("A", tb);
        let (r0, r1) = (fx.rel(0), fx.rel(1));
        let concl = fx.rel_app(2, &[r1]);
        let cmk = fx.pi("a", r0, concl);
        let cbox = fx.one("cbox", &[a], ta, vec![("cmk", cmk)]);
        let c = fx.constraint("cb.a", ConstraintKind::Eq, "cb.b");
        let mut entry = block(vec![cbox]);
        entry.universes = UniverseEntry::Monomorphic { levels: vec![a_name, b_name], constraints: vec![c] };
        let body = fx.check("cbox", &entry)?;
        let la = fx.univ("cb.a");
        assert_eq!(body.packets[0].arity.sort(), Sort::Type(la));
        assert_eq!(body.params[0].ty(), ta);
        assert_eq!(body.packets[0].arity_ctx[0].ty(), ta);
        Ok(())
    })
}

#[test]
fn bifinite_rejects_recursion() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let set = fx.set();
        let (r0, r1) = (fx.rel(0), fx.rel(1));
        let mk = fx.pi("x", r0, r1);
        let bif = fx.one("bif", &[], set, vec![("mk_bif", mk)]);
        let mut entry = block(vec![bif]);
        entry.finite = Finite::BiFinite;
        let expected = IndError::NonRecursiveOccurrence { ind: fx.n("bif"), cstr: fx.n("mk_bif") };
        assert_eq!(fx.check("bif", &entry).err(), Some(expected.clone()));

        // Best-effort mode does not lift the restriction.
        entry.check_positivity = false;
        assert_eq!(fx.check("bif", &entry).err(), Some(expected));
        Ok(())
    })
}

#[test]
fn bifinite_without_recursion() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        fx.declare_nat()?;
        let (set, nat) = (fx.set(), fx.global("nat"));
        let r2 = fx.rel(2);
        let inner = fx.pi("b", nat, r2);
        let mk = fx.pi("a", nat, inner);
        let pair = fx.one("npair", &[], set, vec![("mk_npair", mk)]);
        let mut entry = block(vec![pair]);
        entry.finite = Finite::BiFinite;
        let body = fx.check("npair", &entry)?;
        assert_eq!(body.finite, Finite::BiFinite);
        assert_eq!(body.packets[0].ctor_tags, vec![ConstructorTag::Block { tag: 1, arity: 2 }]);
        Ok(())
    })
}

/// `stream (A : Set) : Set := scons : A -> stream A -> stream A`, coinductive.
#[test]
fn coinductive_stream() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let set = fx.set();
        let a = fx.assum("A", set);
        let (r0, r1) = (fx.rel(0), fx.rel(1));
        let tail = fx.rel_app(2, &[r1]);
        let r2 = fx.rel(2);
        let concl = fx.rel_app(3, &[r2]);
        let inner = fx.pi("t", tail, concl);
        let scons = fx.pi("h", r0, inner);
        let stream = fx.one("stream", &[a], set, vec![("scons", scons)]);
        let mut entry = block(vec![stream]);
        entry.finite = Finite::CoFinite;
        let body = fx.check("stream", &entry)?;
        assert_eq!(body.finite, Finite::CoFinite);
        assert_eq!(body.nparams_rec, 1);
        let ctors = body.packets[0].recargs.dest_subterms().ok_or("stream has no rec-tree node")?;
        assert_eq!(ctors[0][1].dest_recarg(), Some(RecArg::Mrec(body.ind_ref(0))));
        Ok(())
    })
}

/// `np (A B : Set) : Set := c : np B A`
#[test]
fn parameter_passed_out_of_place() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let set = fx.set();
        let (a, b) = (fx.assum("A", set), fx.assum("B", set));
        let (r0, r1) = (fx.rel(0), fx.rel(1));
        let c = fx.rel_app(2, &[r0, r1]);
        let np = fx.one("np", &[a, b], set, vec![("np_c", c)]);
        let expected = IndError::IllFormedConstructor {
            ind: fx.n("np"),
            cstr: fx.n("np_c"),
            arg: 0,
            defect: CtorDefect::NonPar { param: 0 },
        };
        assert_eq!(fx.check("np", &block(vec![np])).err(), Some(expected));
        Ok(())
    })
}

#[test]
fn conclusion_is_another_type() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        fx.declare_nat()?;
        let (set, nat) = (fx.set(), fx.global("nat"));
        let r0 = fx.rel(0);
        let unrelated = fx.pi("x", r0, nat);
        let nc = fx.one("nc", &[], set, vec![("nc_c", unrelated)]);
        let expected = IndError::IllFormedConstructor {
            ind: fx.n("nc"),
            cstr: fx.n("nc_c"),
            arg: 1,
            defect: CtorDefect::NotConstructor,
        };
        assert_eq!(fx.check("nc", &block(vec![nc])).err(), Some(expected));
        Ok(())
    })
}

/// A constructor of `tree` concluding in `forest`.
#[test]
fn conclusion_is_a_sibling() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let mut entry = fx.tree_forest();
        let r0 = fx.rel(0);
        let forest_a = fx.rel_app(1, &[r0]);
        entry.inds[0].lc[0] = forest_a;
        let expected = IndError::IllFormedConstructor {
            ind: fx.n("tree"),
            cstr: fx.n("node"),
            arg: 0,
            defect: CtorDefect::NotConstructor,
        };
        assert_eq!(fx.check("tree", &entry).err(), Some(expected));
        Ok(())
    })
}

#[test]
fn best_effort_accepts_negative_occurrence() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        fx.declare_false()?;
        let prop = fx.prop();
        let (r0, falsity) = (fx.rel(0), fx.global("False"));
        let arrow = fx.pi("", r0, falsity);
        let r1 = fx.rel(1);
        let mk = fx.pi("f", arrow, r1);
        let bad = fx.one("bad", &[], prop, vec![("mk", mk)]);
        let mut entry = block(vec![bad]);
        entry.check_positivity = false;
        let body = fx.declare("bad", &entry)?;
        let ctors = body.packets[0].recargs.dest_subterms().ok_or("bad has no rec-tree node")?;
        assert!(!ctors[0][0].is_recursive());
        Ok(())
    })
}

#[test]
fn best_effort_skips_conclusion_checks() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let set = fx.set();
        let (a, b) = (fx.assum("A", set), fx.assum("B", set));
        let (r0, r1) = (fx.rel(0), fx.rel(1));
        let c = fx.rel_app(2, &[r0, r1]);
        let np = fx.one("np", &[a, b], set, vec![("np_c", c)]);
        let mut entry = block(vec![np]);
        entry.check_positivity = false;
        assert!(fx.check("np", &entry).is_ok());
        Ok(())
    })
}

#[test]
fn block_name_errors() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        fx.declare_nat()?;
        let set = fx.set();
        let r0 = fx.rel(0);
        assert_eq!(fx.check("empty", &block(vec![])).err(), Some(IndError::EmptyBlock));

        let t1 = fx.one("t", &[], set, vec![("t1", r0)]);
        let t2 = fx.one("t", &[], set, vec![("t2", r0)]);
        assert_eq!(fx.check("t", &block(vec![t1, t2])).err(), Some(IndError::DuplicateTypeName(fx.n("t"))));

        let twice = fx.one("u", &[], set, vec![("c", r0), ("c", r0)]);
        assert_eq!(fx.check("u", &block(vec![twice])).err(), Some(IndError::DuplicateConstructorName(fx.n("c"))));

        let shadow = fx.one("v", &[], set, vec![("v", r0)]);
        assert_eq!(fx.check("v", &block(vec![shadow])).err(), Some(IndError::DuplicateConstructorName(fx.n("v"))));

        let clash = fx.one("w", &[], set, vec![("O", r0)]);
        assert_eq!(fx.check("w", &block(vec![clash])).err(), Some(IndError::AlreadyDeclared(fx.n("O"))));

        let again = fx.one("nat2", &[], set, vec![("Z", r0)]);
        assert_eq!(fx.check("nat", &block(vec![again])).err(), Some(IndError::AlreadyDeclared(fx.n("nat"))));

        let mut short = fx.one("x", &[], set, vec![("x1", r0)]);
        short.consnames.push(fx.n("x2"));
        let expected = IndError::Anomaly(Anomaly::ConstructorCountMismatch(fx.n("x")));
        assert_eq!(fx.check("x", &block(vec![short])).err(), Some(expected));
        Ok(())
    })
}

#[test]
fn arity_must_end_in_a_sort() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        fx.declare_nat()?;
        let nat = fx.global("nat");
        let bad = fx.one("notarity", &[], nat, vec![]);
        let expected = IndError::NotAnArity { ind: fx.n("notarity"), arity: nat };
        assert_eq!(fx.check("notarity", &block(vec![bad])).err(), Some(expected));
        Ok(())
    })
}

#[test]
fn ill_typed_constructor() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let set = fx.set();
        // `Rel(5)` is unbound under the single arity.
        let r5 = fx.rel(5);
        let r1 = fx.rel(1);
        let c = fx.pi("x", r5, r1);
        let ill = fx.one("ill", &[], set, vec![("ill_c", c)]);
        match fx.check("ill", &block(vec![ill])) {
            Err(IndError::Type(_)) => Ok(()),
            other => panic!("expected a typing error, got {:?}", other),
        }
    })
}

#[test]
fn mixed_tags() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        fx.declare_nat()?;
        let (set, nat) = (fx.set(), fx.global("nat"));
        let r0 = fx.rel(0);
        let r1 = fx.rel(1);
        let r2 = fx.rel(2);
        let b = fx.pi("n", nat, r1);
        let d_inner = fx.pi("m", nat, r2);
        let d = fx.pi("n", nat, d_inner);
        let tagged = fx.one("tagged", &[], set, vec![("ta", r0), ("tb", b), ("tc", r0), ("td", d)]);
        let body = fx.check("tagged", &block(vec![tagged]))?;
        let packet = &body.packets[0];
        assert_eq!(packet.ctor_tags, vec![
            ConstructorTag::Constant(0),
            ConstructorTag::Block { tag: 1, arity: 1 },
            ConstructorTag::Constant(1),
            ConstructorTag::Block { tag: 2, arity: 2 },
        ]);
        assert_eq!((packet.nb_constant, packet.nb_args), (2, 2));
        Ok(())
    })
}

#[test]
fn tags_from_counts() {
    let (tags, nb_constant, nb_args) = ctor_tags(&[3, 0, 0, 1]);
    assert_eq!(tags, vec![
        ConstructorTag::Block { tag: 1, arity: 3 },
        ConstructorTag::Constant(0),
        ConstructorTag::Constant(1),
        ConstructorTag::Block { tag: 2, arity: 1 },
    ]);
    assert_eq!((nb_constant, nb_args), (2, 2));
    assert_eq!(ctor_tags(&[]), (Vec::new(), 0, 0));
}

#[test]
fn section_variables_become_hyps() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        let (t, set) = (fx.n("T"), fx.set());
        fx.env.add_section_var(&mut fx.ctx, t, set)?;
        let var = fx.ctx.mk_var(t);
        let r1 = fx.rel(1);
        let mk = fx.pi("x", var, r1);
        let wrap = fx.one("wrap", &[], set, vec![("mk_wrap", mk)]);
        let body = fx.check("wrap", &block(vec![wrap]))?;
        assert_eq!(body.hyps, vec![t]);
        Ok(())
    })
}

#[test]
fn nf_lc_exposes_binders() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        fx.declare_nat()?;
        let (set, nat) = (fx.set(), fx.global("nat"));
        // `delayed : Set := dmk : (fun (X : Set) => X -> delayed) nat`
        let r0 = fx.rel(0);
        let r2 = fx.rel(2);
        let fun_body = fx.pi("x", r0, r2);
        let fun = fx.lam("X", set, fun_body);
        let redex = fx.app(fun, &[nat]);
        let delayed = fx.one("delayed", &[], set, vec![("dmk", redex)]);
        let body = fx.check("delayed", &block(vec![delayed]))?;
        let packet = &body.packets[0];
        assert_eq!(packet.consnrealargs, vec![1]);
        let none = fx.ctx.no_levels();
        let ind = fx.ctx.mk_ind(body.ind_ref(0), none);
        let expected = fx.pi("x", nat, ind);
        assert_eq!(packet.nf_lc[0], expected);
        Ok(())
    })
}

#[test]
fn unit_shapes() -> Result<(), Box<dyn Error>> {
    test_fixture(|fx| {
        fx.declare_nat()?;
        let (nat, succ) = (fx.global("nat"), fx.global("S"));
        let (x, y) = (fx.n("x"), fx.n("y"));
        let (r0, r1) = (fx.rel(0), fx.rel(1));
        let succ_x = fx.app(succ, &[r1]);
        let applied_var = fx.app(r1, &[r0]);
        let closed = {
            let inner = fx.pi("y", nat, nat);
            fx.pi("x", nat, inner)
        };

        let mut tc = fx.tc();
        tc.push_assum(x, nat);
        tc.push_assum(y, nat);
        assert_eq!(is_unit(&mut tc, &[])?, UnitCondition::AlwaysUnit);
        assert_eq!(is_unit(&mut tc, &[r1, r0])?, UnitCondition::CondUnit(vec![closed, closed]));
        assert_eq!(is_unit(&mut tc, &[r0, r0])?, UnitCondition::AlwaysUnit);
        assert_eq!(is_unit(&mut tc, &[succ_x, r0])?, UnitCondition::CondUnit(vec![closed, closed]));
        assert_eq!(is_unit(&mut tc, &[succ_x])?, UnitCondition::CondUnit(vec![closed]));
        assert_eq!(is_unit(&mut tc, &[succ_x, r1])?, UnitCondition::AlwaysUnit);
        assert_eq!(is_unit(&mut tc, &[applied_var])?, UnitCondition::NeverUnit);
        assert_eq!(is_unit(&mut tc, &[nat])?, UnitCondition::NeverUnit);
        Ok(())
    })
}

#[test]
fn combined_unit_conditions() {
    use UnitCondition::*;
    assert_eq!(combine_conditions(vec![]), AlwaysUnit);
    assert_eq!(combine_conditions(vec![NeverUnit]), NeverUnit);
    assert_eq!(combine_conditions(vec![AlwaysUnit]), AlwaysUnit);
    assert_eq!(combine_conditions(vec![AlwaysUnit, AlwaysUnit]), NeverUnit);
}
