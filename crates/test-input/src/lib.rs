//! Ready-made element modules for exercising the lowering engine.
//!
//! Real inputs are produced by an extraction tool from compiled element
//! code; the builders here construct equivalent [`LlvmModule`]s directly,
//! so tests stay self-contained and readable. Each builder returns a module
//! shaped like what the extraction of a small Click-style element yields:
//! mangled symbols, a `class.`-prefixed type namespace, and the x86-64 data
//! layout.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

use clift_llvm::{
    Callee, CastOp, IcmpCond, LlvmBlock, LlvmFunction, LlvmInst, LlvmModule, LlvmParam, LlvmTypeId,
    LlvmValue,
};

/// The data layout of the x86-64 targets the extraction tool runs on.
pub const DATA_LAYOUT: &str = "e-m:e-i64:64-f80:128-n8:16:32:64-S128";

/// The entry symbol of the element built by [`counter_module`].
pub const COUNTER_PUSH: &str = "_ZN7Counter4pushEiP6Packet";

/// The entry symbol of the element built by [`classifier_module`].
pub const CLASSIFIER_PUSH: &str = "_ZN10Classifier4pushEiP6Packet";

/// The entry symbol of the element built by [`malformed_module`].
pub const BROKEN_PUSH: &str = "_ZN6Broken4pushEiP6Packet";

/// Builds a module defining a `Counter` element.
///
/// The element keeps one `i64` of state after the element base. Its push
/// handler bumps the counter, asks the packet for its length, and kills
/// oversized packets, which exercises state access through
/// `getelementptr`, builtin calls, a canonicalized signed comparison, and
/// a conditional branch.
#[must_use]
pub fn counter_module() -> LlvmModule {
    let mut module = LlvmModule::new("counter.click", DATA_LAYOUT);

    let void = module.types.void_type();
    let int8 = module.types.int_type(8);
    let int32 = module.types.int_type(32);
    let int64 = module.types.int_type(64);
    let byte_ptr = module.types.pointer_to(int8);
    let element = module.types.declare_struct("class.Element");
    module.types.define_struct(element, vec![byte_ptr, byte_ptr, int32, int32], false);
    let packet = module.types.declare_struct("class.Packet");
    let packet_ptr = module.types.pointer_to(packet);
    let counter = module.types.declare_struct("class.Counter");
    module.types.define_struct(counter, vec![element, int64], false);
    let counter_ptr = module.types.pointer_to(counter);

    let mtu = LlvmValue::ConstInt {
        bits:  32,
        value: 1500,
    };
    let entry = LlvmBlock {
        label: "entry".into(),
        insts: vec![
            LlvmInst::Gep {
                result:  "count_ptr".into(),
                base_ty: counter,
                base:    LlvmValue::Local("this".into()),
                indices: vec![
                    LlvmValue::ConstInt { bits: 32, value: 0 },
                    LlvmValue::ConstInt { bits: 32, value: 1 },
                ],
            },
            LlvmInst::Load {
                result: "count".into(),
                ty:     int64,
                ptr:    LlvmValue::Local("count_ptr".into()),
            },
            LlvmInst::Binary {
                result: "next".into(),
                op:     "add".into(),
                ty:     int64,
                lhs:    LlvmValue::Local("count".into()),
                rhs:    LlvmValue::ConstInt { bits: 64, value: 1 },
            },
            LlvmInst::Store {
                ty:    int64,
                value: LlvmValue::Local("next".into()),
                ptr:   LlvmValue::Local("count_ptr".into()),
            },
            LlvmInst::Call {
                result: Some("len".into()),
                callee: Callee::Symbol("_ZNK6Packet6lengthEv".into()),
                ret:    int32,
                args:   vec![(packet_ptr, LlvmValue::Local("pkt".into()))],
            },
            LlvmInst::ICmp {
                result: "big".into(),
                cond:   IcmpCond::Sgt,
                ty:     int32,
                lhs:    LlvmValue::Local("len".into()),
                rhs:    mtu,
            },
            LlvmInst::CondBr {
                cond:     LlvmValue::Local("big".into()),
                if_true:  "kill".into(),
                if_false: "done".into(),
            },
        ],
    };
    let kill = LlvmBlock {
        label: "kill".into(),
        insts: vec![
            LlvmInst::Call {
                result: None,
                callee: Callee::Symbol("_ZN6Packet4killEv".into()),
                ret:    void,
                args:   vec![(packet_ptr, LlvmValue::Local("pkt".into()))],
            },
            LlvmInst::Ret { value: None },
        ],
    };
    let done = LlvmBlock {
        label: "done".into(),
        insts: vec![LlvmInst::Ret { value: None }],
    };

    module.functions.push(LlvmFunction {
        name:   COUNTER_PUSH.into(),
        params: vec![
            LlvmParam {
                name: "this".into(),
                ty:   counter_ptr,
            },
            LlvmParam {
                name: "port".into(),
                ty:   int32,
            },
            LlvmParam {
                name: "pkt".into(),
                ty:   packet_ptr,
            },
        ],
        ret:    void,
        blocks: vec![entry, kill, done],
    });
    declare(&mut module, "_ZNK6Packet6lengthEv", &[packet_ptr], int32);
    declare(&mut module, "_ZN6Packet4killEv", &[packet_ptr], void);

    module
}

/// Builds a module defining a `Classifier` element.
///
/// The push handler switches on the input port and merges a per-port
/// constant with a phi before handing the packet on, which exercises the
/// switch-to-compare-chain lowering, block forward references, and phi
/// incoming resolution. A helper function truncates the merged value, so
/// the module also exercises the call path to a function defined in the
/// same module.
#[must_use]
pub fn classifier_module() -> LlvmModule {
    let mut module = LlvmModule::new("classifier.click", DATA_LAYOUT);

    let void = module.types.void_type();
    let int8 = module.types.int_type(8);
    let int32 = module.types.int_type(32);
    let byte_ptr = module.types.pointer_to(int8);
    let element = module.types.declare_struct("class.Element");
    module.types.define_struct(element, vec![byte_ptr, byte_ptr, int32, int32], false);
    let packet = module.types.declare_struct("class.Packet");
    let packet_ptr = module.types.pointer_to(packet);
    let classifier = module.types.declare_struct("class.Classifier");
    module.types.define_struct(classifier, vec![element], false);
    let classifier_ptr = module.types.pointer_to(classifier);

    let entry = LlvmBlock {
        label: "entry".into(),
        insts: vec![LlvmInst::Switch {
            value:   LlvmValue::Local("port".into()),
            ty:      int32,
            default: "other".into(),
            cases:   vec![(0, "arp".into()), (1, "ip".into())],
        }],
    };
    let arp = LlvmBlock {
        label: "arp".into(),
        insts: vec![LlvmInst::Br {
            dest: "merge".into(),
        }],
    };
    let ip = LlvmBlock {
        label: "ip".into(),
        insts: vec![LlvmInst::Br {
            dest: "merge".into(),
        }],
    };
    let other = LlvmBlock {
        label: "other".into(),
        insts: vec![LlvmInst::Unreachable],
    };
    let arp_proto = LlvmValue::ConstInt {
        bits:  32,
        value: 2054,
    };
    let ip_proto = LlvmValue::ConstInt {
        bits:  32,
        value: 2048,
    };
    let merge = LlvmBlock {
        label: "merge".into(),
        insts: vec![
            LlvmInst::Phi {
                result:   "proto".into(),
                ty:       int32,
                incoming: vec![(arp_proto, "arp".into()), (ip_proto, "ip".into())],
            },
            LlvmInst::Call {
                result: Some("tag".into()),
                callee: Callee::Symbol("_ZN10Classifier3tagEi".into()),
                ret:    int8,
                args:   vec![(int32, LlvmValue::Local("proto".into()))],
            },
            LlvmInst::Ret { value: None },
        ],
    };

    module.functions.push(LlvmFunction {
        name:   CLASSIFIER_PUSH.into(),
        params: vec![
            LlvmParam {
                name: "this".into(),
                ty:   classifier_ptr,
            },
            LlvmParam {
                name: "port".into(),
                ty:   int32,
            },
            LlvmParam {
                name: "pkt".into(),
                ty:   packet_ptr,
            },
        ],
        ret:    void,
        blocks: vec![entry, arp, ip, other, merge],
    });

    let tag_entry = LlvmBlock {
        label: "entry".into(),
        insts: vec![
            LlvmInst::Cast {
                result: "small".into(),
                op:     CastOp::Trunc,
                to:     int8,
                value:  LlvmValue::Local("proto".into()),
            },
            LlvmInst::Ret {
                value: Some(LlvmValue::Local("small".into())),
            },
        ],
    };
    module.functions.push(LlvmFunction {
        name:   "_ZN10Classifier3tagEi".into(),
        params: vec![LlvmParam {
            name: "proto".into(),
            ty:   int32,
        }],
        ret:    int8,
        blocks: vec![tag_entry],
    });

    module
}

/// Builds a module defining a `Broken` element whose push handler reads a
/// local that nothing defines. Lowering it must fail.
#[must_use]
pub fn malformed_module() -> LlvmModule {
    let mut module = LlvmModule::new("broken.click", DATA_LAYOUT);

    let void = module.types.void_type();
    let int8 = module.types.int_type(8);
    let int32 = module.types.int_type(32);
    let byte_ptr = module.types.pointer_to(int8);
    let element = module.types.declare_struct("class.Element");
    module.types.define_struct(element, vec![byte_ptr, byte_ptr, int32, int32], false);
    let packet = module.types.declare_struct("class.Packet");
    let packet_ptr = module.types.pointer_to(packet);
    let broken = module.types.declare_struct("class.Broken");
    module.types.define_struct(broken, vec![element], false);
    let broken_ptr = module.types.pointer_to(broken);

    let entry = LlvmBlock {
        label: "entry".into(),
        insts: vec![
            LlvmInst::Load {
                result: "x".into(),
                ty:     int32,
                ptr:    LlvmValue::Local("missing".into()),
            },
            LlvmInst::Ret { value: None },
        ],
    };
    module.functions.push(LlvmFunction {
        name:   BROKEN_PUSH.into(),
        params: vec![
            LlvmParam {
                name: "this".into(),
                ty:   broken_ptr,
            },
            LlvmParam {
                name: "port".into(),
                ty:   int32,
            },
            LlvmParam {
                name: "pkt".into(),
                ty:   packet_ptr,
            },
        ],
        ret:    void,
        blocks: vec![entry],
    });

    module
}

/// Adds a bodyless declaration for `symbol` to `module`.
fn declare(module: &mut LlvmModule, symbol: &str, params: &[LlvmTypeId], ret: LlvmTypeId) {
    let params = params
        .iter()
        .enumerate()
        .map(|(i, ty)| LlvmParam {
            name: format!("arg{i}"),
            ty:   *ty,
        })
        .collect();
    module.functions.push(LlvmFunction {
        name: symbol.into(),
        params,
        ret,
        blocks: Vec::new(),
    });
}
