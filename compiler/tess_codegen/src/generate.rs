//! Fragment emission per node.
//!
//! Each node emits its own fragment and composes its children's
//! fragments preamble-before-use, postamble-after. Literal operands
//! that can generate a single expression are inlined directly instead
//! of being routed through runtime evaluation. An unimplemented
//! construct emits a placeholder diagnostic comment and generation of
//! the rest of the unit continues.

use tracing::debug;

use tess_ast::{
    AstArena, BinaryOp, DefBody, DefId, GuardOp, Module, Param, Reference, StmtId, StmtKind,
    StringInterner, SubRef, TemplateId, TemplateKind, TypeId, UnaryOp, ValueId, ValueKind, Verdict,
};

use crate::context::GenContext;
use crate::fragment::ExpressionFragment;
use crate::{CodegenError, CodegenResult};

/// Generate the C rendition of one compilation unit.
///
/// Produces the ordered code fragments plus the deduplicated runtime
/// import manifest. Generation never aborts on an unimplemented
/// construct.
#[tracing::instrument(level = "debug", skip_all)]
pub fn generate_module(
    arena: &AstArena,
    interner: &StringInterner,
    module: &Module,
) -> CodegenResult {
    let mut ctx = GenContext::new(arena, interner);
    ctx.require("tessrt/runtime.h");

    let module_name = interner.lookup(module.name);
    ctx.line(&format!("/* Generated from module {module_name}. */"));
    ctx.blank();

    let mut errors = Vec::new();
    for &def_id in &module.defs {
        gen_def(&mut ctx, def_id, &mut errors);
        ctx.blank();
    }

    let (code, imports) = ctx.finish();
    debug!(bytes = code.len(), imports = imports.len(), "module generated");
    CodegenResult {
        code,
        imports,
        errors,
    }
}

fn gen_def(ctx: &mut GenContext<'_>, def_id: DefId, errors: &mut Vec<CodegenError>) {
    let def = ctx.arena.def(def_id);
    let name = ctx.mangle(def.name);
    let body = def.body.clone();
    let declared_ty = def.ty;

    match body {
        DefBody::Constant { init } => gen_const(ctx, &name, declared_ty, init),
        DefBody::Variable { init } => {
            let c_ty = ctx.c_type(declared_ty);
            ctx.line(&format!("static {c_ty} {name};"));
            if let Some(init) = init {
                let frag = gen_value(ctx, init);
                ctx.raw(&frag.preamble);
                ctx.line(&format!("/* initialized at startup: {name} = {} */", frag.expression));
                ctx.raw(&frag.postamble);
            }
        }
        DefBody::Template { template } => {
            gen_template_def(ctx, &name, template);
        }
        DefBody::Port => {
            ctx.require("tessrt/port.h");
            ctx.line(&format!("static tessrt_port {name};"));
        }
        DefBody::Timer { default_duration } => {
            ctx.require("tessrt/timer.h");
            match default_duration {
                Some(duration) => {
                    let frag = gen_value(ctx, duration);
                    if frag.is_single_expression() {
                        ctx.line(&format!(
                            "static tessrt_timer {name} = TESSRT_TIMER_INIT({});",
                            frag.expression
                        ));
                    } else {
                        ctx.line(&format!("static tessrt_timer {name};"));
                        ctx.line(&format!(
                            "/* unsupported construct: non-literal timer duration for {name} */"
                        ));
                        errors.push(CodegenError {
                            message: format!("non-literal default duration on timer `{name}`"),
                        });
                    }
                }
                None => ctx.line(&format!("static tessrt_timer {name};")),
            }
        }
        DefBody::Function {
            params,
            return_type,
            body,
            ..
        } => {
            let ret = match return_type {
                Some(ty) => ctx.c_type(ty),
                None => "void",
            };
            let sig = signature(ctx, &name, &params, ret);
            ctx.line(&sig);
            gen_block(ctx, body);
        }
        DefBody::Testcase { params, body, .. } => {
            ctx.require("tessrt/component.h");
            ctx.require("tessrt/verdict.h");
            let sig = signature(ctx, &name, &params, "tessrt_verdict");
            ctx.line(&sig);
            ctx.line("{");
            ctx.indent();
            ctx.line("tessrt_testcase_begin(rt);");
            let stmts = ctx.arena.block(body).stmts.clone();
            for stmt in stmts {
                gen_stmt(ctx, stmt);
            }
            ctx.line("return tessrt_testcase_end(rt);");
            ctx.dedent();
            ctx.line("}");
        }
        DefBody::Altstep {
            params, guards, ..
        } => {
            ctx.require("tessrt/alt.h");
            let sig = signature(ctx, &name, &params, "tessrt_alt_status");
            ctx.line(&sig);
            ctx.line("{");
            ctx.indent();
            // An altstep body is tried once per enclosing alt snapshot:
            // the first matching guard runs and reports a match.
            for guard in &guards.guards {
                let cond = gen_guard_condition(ctx, &guard.op, guard.guard);
                ctx.raw(&cond.preamble);
                ctx.line(&format!("if ({}) {{", cond.expression));
                ctx.indent();
                let stmts = ctx.arena.block(guard.block).stmts.clone();
                for stmt in stmts {
                    gen_stmt(ctx, stmt);
                }
                ctx.line("return TESSRT_ALT_MATCHED;");
                ctx.dedent();
                ctx.line("}");
                ctx.raw(&cond.postamble);
            }
            ctx.line("return TESSRT_ALT_NO_MATCH;");
            ctx.dedent();
            ctx.line("}");
        }
    }
}

fn signature(ctx: &mut GenContext<'_>, name: &str, params: &[Param], ret: &str) -> String {
    let mut sig = format!("static {ret} {name}(tessrt_ctx *rt");
    for param in params {
        let c_ty = ctx.c_type(param.ty);
        let param_name = ctx.mangle(param.name);
        sig.push_str(&format!(", {c_ty} {param_name}"));
    }
    sig.push(')');
    sig
}

fn gen_const(ctx: &mut GenContext<'_>, name: &str, ty: TypeId, init: ValueId) {
    let frag = gen_value(ctx, init);
    let c_ty = ctx.c_type(ty);
    if frag.is_single_expression() {
        // Literal constants inline directly; no runtime evaluation.
        ctx.line(&format!("static const {c_ty} {name} = {};", frag.expression));
    } else {
        // Needs runtime construction: emit an accessor instead.
        ctx.line(&format!("static {c_ty} {name}_value(tessrt_ctx *rt)"));
        ctx.line("{");
        ctx.indent();
        ctx.raw(&frag.preamble);
        ctx.line(&format!("return {};", frag.expression));
        ctx.dedent();
        ctx.line("}");
    }
}

fn gen_template_def(ctx: &mut GenContext<'_>, name: &str, template: TemplateId) {
    let kind = ctx.arena.template(template).kind.clone();
    match kind {
        TemplateKind::Specific(value) => {
            let frag = gen_value(ctx, value);
            ctx.line(&format!("static tessrt_matcher {name}_matcher(tessrt_ctx *rt)"));
            ctx.line("{");
            ctx.indent();
            ctx.raw(&frag.preamble);
            ctx.line(&format!("return tessrt_match_value({});", frag.expression));
            ctx.raw(&frag.postamble);
            ctx.dedent();
            ctx.line("}");
        }
        TemplateKind::Any | TemplateKind::AnyOrOmit | TemplateKind::Omit => {
            ctx.line(&format!(
                "static tessrt_matcher {name}_matcher(tessrt_ctx *rt) {{ (void)rt; return {}; }}",
                wildcard_matcher(&kind)
            ));
        }
        other => {
            // Placeholder; the rest of the unit still generates.
            ctx.line(&format!(
                "/* unsupported construct: {} template for {name} */",
                other.describe()
            ));
        }
    }
}

fn gen_block(ctx: &mut GenContext<'_>, block: tess_ast::BlockId) {
    ctx.line("{");
    ctx.indent();
    let stmts = ctx.arena.block(block).stmts.clone();
    for stmt in stmts {
        gen_stmt(ctx, stmt);
    }
    ctx.dedent();
    ctx.line("}");
}

fn gen_stmt(ctx: &mut GenContext<'_>, stmt_id: StmtId) {
    let kind = ctx.arena.stmt(stmt_id).kind.clone();
    match kind {
        StmtKind::Block(block) => gen_block(ctx, block),
        StmtKind::Def(def) => gen_local_def(ctx, def),
        StmtKind::Assign { lhs, rhs } => {
            let lhs_frag = gen_value(ctx, lhs);
            let rhs_frag = gen_value(ctx, rhs);
            ctx.raw(&lhs_frag.preamble);
            ctx.raw(&rhs_frag.preamble);
            ctx.line(&format!("{} = {};", lhs_frag.expression, rhs_frag.expression));
            ctx.raw(&rhs_frag.postamble);
            ctx.raw(&lhs_frag.postamble);
        }
        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => {
            let cond_frag = gen_value(ctx, cond);
            ctx.raw(&cond_frag.preamble);
            ctx.line(&format!("if ({})", cond_frag.expression));
            gen_block(ctx, then_block);
            if let Some(else_block) = else_block {
                ctx.line("else");
                gen_block(ctx, else_block);
            }
            ctx.raw(&cond_frag.postamble);
        }
        StmtKind::While { cond, body } => {
            let cond_frag = gen_value(ctx, cond);
            if cond_frag.is_single_expression() {
                ctx.line(&format!("while ({})", cond_frag.expression));
                gen_block(ctx, body);
            } else {
                // The condition needs setup on every iteration.
                ctx.line("for (;;) {");
                ctx.indent();
                ctx.raw(&cond_frag.preamble);
                ctx.line(&format!("bool cont = {};", cond_frag.expression));
                ctx.raw(&cond_frag.postamble);
                ctx.line("if (!cont) break;");
                gen_block(ctx, body);
                ctx.dedent();
                ctx.line("}");
            }
        }
        StmtKind::DoWhile { cond, body } => {
            let cond_frag = gen_value(ctx, cond);
            if cond_frag.is_single_expression() {
                ctx.line("do");
                gen_block(ctx, body);
                ctx.line(&format!("while ({});", cond_frag.expression));
            } else {
                // The condition needs setup after every iteration.
                ctx.line("for (;;) {");
                ctx.indent();
                gen_block(ctx, body);
                ctx.raw(&cond_frag.preamble);
                ctx.line(&format!("bool again = {};", cond_frag.expression));
                ctx.raw(&cond_frag.postamble);
                ctx.line("if (!again) break;");
                ctx.dedent();
                ctx.line("}");
            }
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            ctx.line("{");
            ctx.indent();
            if let Some(init) = init {
                gen_stmt(ctx, init);
            }
            let cond_frag = gen_value(ctx, cond);
            if cond_frag.is_single_expression() {
                ctx.line(&format!("while ({}) {{", cond_frag.expression));
                ctx.indent();
            } else {
                // The condition needs setup on every iteration.
                ctx.line("for (;;) {");
                ctx.indent();
                ctx.raw(&cond_frag.preamble);
                ctx.line(&format!("bool cont = {};", cond_frag.expression));
                ctx.raw(&cond_frag.postamble);
                ctx.line("if (!cont) break;");
            }
            gen_block(ctx, body);
            if let Some(step) = step {
                gen_stmt(ctx, step);
            }
            ctx.dedent();
            ctx.line("}");
            ctx.dedent();
            ctx.line("}");
        }
        StmtKind::Label(name) => {
            let label = ctx.interner.lookup(name);
            ctx.line(&format!("lbl_{label}:;"));
        }
        StmtKind::Goto(name) => {
            let label = ctx.interner.lookup(name);
            ctx.line(&format!("goto lbl_{label};"));
        }
        StmtKind::Return(value) => match value {
            None => ctx.line("return;"),
            Some(value) => {
                let frag = gen_value(ctx, value);
                ctx.raw(&frag.preamble);
                if frag.postamble.is_empty() {
                    ctx.line(&format!("return {};", frag.expression));
                } else {
                    // Keep the cleanup ahead of the return.
                    let temp = ctx.fresh_temp("ret");
                    ctx.require("tessrt/charstring.h");
                    ctx.line(&format!("tessrt_charstring {temp} = {};", frag.expression));
                    ctx.raw(&frag.postamble);
                    ctx.line(&format!("return {temp};"));
                }
            }
        },
        StmtKind::Alt(guards) => gen_alt(ctx, &guards, false),
        StmtKind::Interleave(guards) => gen_alt(ctx, &guards, true),
        StmtKind::Invoke { callee, args } => {
            let call = gen_call(ctx, &callee, &args);
            ctx.raw(&call.preamble);
            ctx.line(&format!("{};", call.expression));
            ctx.raw(&call.postamble);
        }
        StmtKind::Send { port, template } => {
            ctx.require("tessrt/port.h");
            let port_name = mangle_head(ctx, &port);
            let arg = gen_template_arg(ctx, Some(template));
            ctx.raw(&arg.preamble);
            ctx.line(&format!("tessrt_port_send(rt, &{port_name}, {});", arg.expression));
            ctx.raw(&arg.postamble);
        }
        StmtKind::Receive { port, template } => {
            ctx.require("tessrt/port.h");
            let port_name = mangle_head(ctx, &port);
            let arg = gen_template_arg(ctx, template);
            ctx.raw(&arg.preamble);
            ctx.line(&format!(
                "tessrt_port_receive_blocking(rt, &{port_name}, {});",
                arg.expression
            ));
            ctx.raw(&arg.postamble);
        }
        StmtKind::TimerStart { timer, duration } => {
            ctx.require("tessrt/timer.h");
            let timer_name = mangle_head(ctx, &timer);
            match duration {
                Some(duration) => {
                    let frag = gen_value(ctx, duration);
                    ctx.raw(&frag.preamble);
                    ctx.line(&format!(
                        "tessrt_timer_start(rt, &{timer_name}, {});",
                        frag.expression
                    ));
                    ctx.raw(&frag.postamble);
                }
                None => ctx.line(&format!(
                    "tessrt_timer_start_default(rt, &{timer_name});"
                )),
            }
        }
        StmtKind::TimerStop { timer } => {
            ctx.require("tessrt/timer.h");
            let timer_name = mangle_head(ctx, &timer);
            ctx.line(&format!("tessrt_timer_stop(rt, &{timer_name});"));
        }
        StmtKind::SetVerdict(value) => {
            ctx.require("tessrt/verdict.h");
            let frag = gen_value(ctx, value);
            ctx.raw(&frag.preamble);
            ctx.line(&format!("tessrt_setverdict(rt, {});", frag.expression));
            ctx.raw(&frag.postamble);
        }
        StmtKind::Log(value) => {
            let frag = gen_value(ctx, value);
            ctx.raw(&frag.preamble);
            ctx.line(&format!("tessrt_log(rt, {});", frag.expression));
            ctx.raw(&frag.postamble);
        }
        StmtKind::Repeat => match ctx.alt_labels.last() {
            Some(label) => {
                let label = label.clone();
                ctx.line(&format!("goto {label};"));
            }
            None => ctx.line("/* unsupported construct: repeat outside alt */"),
        },
        StmtKind::Break => ctx.line("break;"),
        StmtKind::Continue => ctx.line("continue;"),
        // The runtime call does not return.
        StmtKind::Stop => ctx.line("tessrt_stop(rt);"),
    }
}

fn gen_local_def(ctx: &mut GenContext<'_>, def_id: DefId) {
    let def = ctx.arena.def(def_id);
    let name = ctx.mangle(def.name);
    let ty = def.ty;
    match def.body.clone() {
        DefBody::Variable { init } => {
            let c_ty = ctx.c_type(ty);
            match init {
                Some(init) => {
                    let frag = gen_value(ctx, init);
                    ctx.raw(&frag.preamble);
                    ctx.line(&format!("{c_ty} {name} = {};", frag.expression));
                    ctx.raw(&frag.postamble);
                }
                None => ctx.line(&format!("{c_ty} {name};")),
            }
        }
        DefBody::Constant { init } => {
            let c_ty = ctx.c_type(ty);
            let frag = gen_value(ctx, init);
            ctx.raw(&frag.preamble);
            ctx.line(&format!("const {c_ty} {name} = {};", frag.expression));
            ctx.raw(&frag.postamble);
        }
        DefBody::Timer { .. } => {
            ctx.require("tessrt/timer.h");
            ctx.line(&format!("tessrt_timer {name} = tessrt_timer_local(rt);"));
        }
        other => {
            ctx.line(&format!(
                "/* unsupported construct: local {} definition */",
                describe_body(&other)
            ));
        }
    }
}

fn describe_body(body: &DefBody) -> &'static str {
    match body {
        DefBody::Function { .. } => "function",
        DefBody::Altstep { .. } => "altstep",
        DefBody::Testcase { .. } => "testcase",
        DefBody::Constant { .. } => "constant",
        DefBody::Variable { .. } => "variable",
        DefBody::Template { .. } => "template",
        DefBody::Port => "port",
        DefBody::Timer { .. } => "timer",
    }
}

/// Alt and interleave lowering.
///
/// Branch order is semantic: guards are tried strictly in source
/// order, so the first syntactically matching, semantically true guard
/// wins the rendezvous.
fn gen_alt(ctx: &mut GenContext<'_>, guards: &tess_ast::AltGuards, interleave: bool) {
    ctx.require("tessrt/alt.h");
    let label = ctx.fresh_temp("alt");
    let ilv = if interleave {
        let ilv = ctx.fresh_temp("ilv");
        ctx.line(&format!(
            "tessrt_interleave {ilv} = tessrt_interleave_begin(rt, {});",
            guards.len()
        ));
        Some(ilv)
    } else {
        None
    };

    ctx.line(&format!("{label}:;"));
    ctx.alt_labels.push(label);
    match &ilv {
        Some(ilv) => ctx.line(&format!("while (!tessrt_interleave_done(&{ilv})) {{")),
        None => ctx.line("for (;;) {"),
    }
    ctx.indent();
    ctx.line("tessrt_snapshot(rt);");

    for (index, guard) in guards.guards.iter().enumerate() {
        let mut cond = gen_guard_condition(ctx, &guard.op, guard.guard);
        if let Some(ilv) = &ilv {
            cond.expression = format!(
                "!tessrt_interleave_fired(&{ilv}, {index}) && ({})",
                cond.expression
            );
        }
        ctx.raw(&cond.preamble);
        ctx.line(&format!("if ({}) {{", cond.expression));
        ctx.indent();
        if let Some(ilv) = &ilv {
            ctx.line(&format!("tessrt_interleave_mark(&{ilv}, {index});"));
        }
        let stmts = ctx.arena.block(guard.block).stmts.clone();
        for stmt in stmts {
            gen_stmt(ctx, stmt);
        }
        if ilv.is_some() {
            ctx.line("continue;");
        } else {
            ctx.line("break;");
        }
        ctx.dedent();
        ctx.line("}");
        ctx.raw(&cond.postamble);
    }

    ctx.line("tessrt_alt_wait(rt);");
    ctx.dedent();
    ctx.line("}");
    ctx.alt_labels.pop();
}

fn gen_guard_condition(
    ctx: &mut GenContext<'_>,
    op: &GuardOp,
    guard: Option<ValueId>,
) -> ExpressionFragment {
    let mut frag = ExpressionFragment::default();
    let op_expr = match op {
        GuardOp::Receive { port, template } => {
            ctx.require("tessrt/port.h");
            let port_name = mangle_head(ctx, port);
            let arg = gen_template_arg(ctx, *template);
            let arg_expr = frag.absorb(&arg).to_owned();
            format!("tessrt_port_receive(rt, &{port_name}, {arg_expr})")
        }
        GuardOp::Trigger { port, template } => {
            ctx.require("tessrt/port.h");
            let port_name = mangle_head(ctx, port);
            let arg = gen_template_arg(ctx, *template);
            let arg_expr = frag.absorb(&arg).to_owned();
            format!("tessrt_port_trigger(rt, &{port_name}, {arg_expr})")
        }
        GuardOp::GetCall { port, template } => {
            ctx.require("tessrt/port.h");
            let port_name = mangle_head(ctx, port);
            let arg = gen_template_arg(ctx, *template);
            let arg_expr = frag.absorb(&arg).to_owned();
            format!("tessrt_port_getcall(rt, &{port_name}, {arg_expr})")
        }
        GuardOp::GetReply { port, template } => {
            ctx.require("tessrt/port.h");
            let port_name = mangle_head(ctx, port);
            let arg = gen_template_arg(ctx, *template);
            let arg_expr = frag.absorb(&arg).to_owned();
            format!("tessrt_port_getreply(rt, &{port_name}, {arg_expr})")
        }
        GuardOp::Timeout { timer } => {
            ctx.require("tessrt/timer.h");
            let timer_name = mangle_head(ctx, timer);
            format!("tessrt_timer_timeout(rt, &{timer_name})")
        }
        GuardOp::Done { component } => {
            ctx.require("tessrt/component.h");
            let comp = gen_reference(ctx, component);
            let comp_expr = frag.absorb(&comp).to_owned();
            format!("tessrt_component_done(rt, {comp_expr})")
        }
        GuardOp::Else => "true".to_owned(),
        GuardOp::Invoke { callee, args } => {
            let call = gen_call(ctx, callee, args);
            let call_expr = frag.absorb(&call).to_owned();
            format!("{call_expr} == TESSRT_ALT_MATCHED")
        }
    };

    frag.expression = match guard {
        Some(guard_value) => {
            let guard_frag = gen_value(ctx, guard_value);
            let guard_expr = frag.absorb(&guard_frag).to_owned();
            format!("({guard_expr}) && {op_expr}")
        }
        None => op_expr,
    };
    frag
}

fn gen_call(ctx: &mut GenContext<'_>, callee: &Reference, args: &[ValueId]) -> ExpressionFragment {
    let mut frag = ExpressionFragment::default();
    let name = mangle_head(ctx, callee);
    let mut rendered = format!("{name}(rt");
    for &arg in args {
        let arg_frag = gen_value(ctx, arg);
        let arg_expr = frag.absorb(&arg_frag).to_owned();
        rendered.push_str(", ");
        rendered.push_str(&arg_expr);
    }
    rendered.push(')');
    frag.expression = rendered;
    frag
}

fn mangle_head(ctx: &GenContext<'_>, reference: &Reference) -> String {
    ctx.mangle(reference.name)
}

fn gen_reference(ctx: &mut GenContext<'_>, reference: &Reference) -> ExpressionFragment {
    let mut frag = ExpressionFragment::default();
    let mut rendered = ctx.mangle(reference.name);
    for subref in &reference.subrefs {
        match subref {
            SubRef::Field(field) => {
                rendered.push('.');
                rendered.push_str(ctx.interner.lookup(*field));
            }
            SubRef::Index(index) => {
                let index_frag = gen_value(ctx, *index);
                let index_expr = frag.absorb(&index_frag).to_owned();
                rendered = format!("{rendered}.elems[{index_expr}]");
            }
            SubRef::Call(args) => {
                let mut call = format!("{rendered}(rt");
                for &arg in args {
                    let arg_frag = gen_value(ctx, arg);
                    let arg_expr = frag.absorb(&arg_frag).to_owned();
                    call.push_str(", ");
                    call.push_str(&arg_expr);
                }
                call.push(')');
                rendered = call;
            }
        }
    }
    frag.expression = rendered;
    frag
}

/// Generate a value fragment. Literal operands that can generate a
/// single expression are inlined directly.
fn gen_value(ctx: &mut GenContext<'_>, value_id: ValueId) -> ExpressionFragment {
    let kind = ctx.arena.value(value_id).kind.clone();
    match kind {
        ValueKind::IntLit(v) => ExpressionFragment::single(format!("INT64_C({v})")),
        ValueKind::FloatLit(v) => {
            let mut rendered = format!("{v}");
            if !rendered.contains('.') && !rendered.contains('e') {
                rendered.push_str(".0");
            }
            ExpressionFragment::single(rendered)
        }
        ValueKind::BoolLit(v) => ExpressionFragment::single(if v { "true" } else { "false" }),
        ValueKind::VerdictLit(v) => {
            ctx.require("tessrt/verdict.h");
            ExpressionFragment::single(verdict_constant(v))
        }
        ValueKind::CharstringLit(text) => {
            // Charstrings need runtime construction and cleanup.
            ctx.require("tessrt/charstring.h");
            let temp = ctx.fresh_temp("cs");
            ExpressionFragment {
                preamble: format!(
                    "tessrt_charstring {temp} = tessrt_cs_literal(\"{}\");\n",
                    escape_c(&text)
                ),
                expression: temp.clone(),
                postamble: format!("tessrt_cs_free(&{temp});\n"),
            }
        }
        ValueKind::Reference(reference) => gen_reference(ctx, &reference),
        ValueKind::Unary { op, operand } => {
            let mut frag = ExpressionFragment::default();
            let operand_frag = gen_value(ctx, operand);
            let operand_expr = frag.absorb(&operand_frag).to_owned();
            frag.expression = match op {
                UnaryOp::Neg => format!("(-{operand_expr})"),
                UnaryOp::Not => format!("(!{operand_expr})"),
            };
            frag
        }
        ValueKind::Binary { op, lhs, rhs } => gen_binary(ctx, op, lhs, rhs),
        ValueKind::Undefined => {
            ExpressionFragment::single("0 /* unsupported construct: undefined value */")
        }
    }
}

fn gen_binary(
    ctx: &mut GenContext<'_>,
    op: BinaryOp,
    lhs: ValueId,
    rhs: ValueId,
) -> ExpressionFragment {
    let mut frag = ExpressionFragment::default();
    let lhs_frag = gen_value(ctx, lhs);
    let lhs_expr = frag.absorb(&lhs_frag).to_owned();
    let rhs_frag = gen_value(ctx, rhs);
    let rhs_expr = frag.absorb(&rhs_frag).to_owned();

    if matches!(op, BinaryOp::Concat) {
        // Concatenation allocates; route through the runtime with its
        // own temporary.
        ctx.require("tessrt/charstring.h");
        let temp = ctx.fresh_temp("cs");
        frag.preamble.push_str(&format!(
            "tessrt_charstring {temp} = tessrt_cs_concat(rt, {lhs_expr}, {rhs_expr});\n"
        ));
        frag.postamble = format!("tessrt_cs_free(&{temp});\n{}", frag.postamble);
        frag.expression = temp;
        return frag;
    }

    let rendered_op = match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::Xor => "!=",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Concat => "/* unreachable */",
    };
    frag.expression = format!("({lhs_expr} {rendered_op} {rhs_expr})");
    frag
}

fn gen_template_arg(ctx: &mut GenContext<'_>, template: Option<TemplateId>) -> ExpressionFragment {
    let Some(template) = template else {
        return ExpressionFragment::single("NULL");
    };
    let kind = ctx.arena.template(template).kind.clone();
    match kind {
        TemplateKind::Specific(value) => {
            let mut frag = ExpressionFragment::default();
            let value_frag = gen_value(ctx, value);
            let value_expr = frag.absorb(&value_frag).to_owned();
            frag.expression = format!("tessrt_match_value({value_expr})");
            frag
        }
        TemplateKind::Any | TemplateKind::AnyOrOmit | TemplateKind::Omit => {
            ExpressionFragment::single(wildcard_matcher(&kind))
        }
        other => {
            // Placeholder; matching degrades to a wildcard.
            ExpressionFragment::single(format!(
                "tessrt_match_any() /* unsupported construct: {} template */",
                other.describe()
            ))
        }
    }
}

fn wildcard_matcher(kind: &TemplateKind) -> &'static str {
    match kind {
        TemplateKind::Any => "tessrt_match_any()",
        TemplateKind::AnyOrOmit => "tessrt_match_any_or_omit()",
        TemplateKind::Omit => "tessrt_match_omit()",
        _ => "tessrt_match_any()",
    }
}

fn verdict_constant(v: Verdict) -> &'static str {
    match v {
        Verdict::None => "TESSRT_VERDICT_NONE",
        Verdict::Pass => "TESSRT_VERDICT_PASS",
        Verdict::Inconc => "TESSRT_VERDICT_INCONC",
        Verdict::Fail => "TESSRT_VERDICT_FAIL",
        Verdict::Error => "TESSRT_VERDICT_ERROR",
    }
}

fn escape_c(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
