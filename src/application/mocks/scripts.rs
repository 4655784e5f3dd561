// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Generated JavaScript payloads for the in-process (inner) mock.
//!
//! Every payload is a function source evaluated by the execute bridge, so
//! the first injected parameter is the `electron` module (Electron) or the
//! Tauri APIs object (Tauri). The in-process registry lives on
//! `globalThis.__wdioMockRegistry` and carries the worker-wide monotonic
//! call counter shared by every mock.

/// Probe whether `electron[api][func]` exists and is a function.
///
/// Returns `"ok"`, `"api-missing"`, or `"func-missing"`.
#[must_use]
pub fn probe_target() -> &'static str {
    "(electron, api, func) => {\n\
       const target = electron[api];\n\
       if (!target) return 'api-missing';\n\
       if (typeof target[func] !== 'function') return 'func-missing';\n\
       return 'ok';\n\
     }"
}

/// List the function-valued members of `electron[api]`.
///
/// Non-function members are deliberately skipped.
#[must_use]
pub fn list_functions() -> &'static str {
    "(electron, api) => {\n\
       const target = electron[api];\n\
       if (!target) return null;\n\
       return Object.keys(target).filter((key) => typeof target[key] === 'function');\n\
     }"
}

/// Install the recording interceptor over `electron[api][func]`.
///
/// Idempotent per `(api, func)`. The interceptor stamps each call from the
/// registry-wide counter, consumes the one-shot queue FIFO before the
/// default implementation, and records arguments and outcome exactly once
/// per call.
#[must_use]
pub fn install_mock() -> &'static str {
    "(electron, api, func) => {\n\
       const registry = (globalThis.__wdioMockRegistry =\n\
         globalThis.__wdioMockRegistry || { order: 0, mocks: {} });\n\
       const key = api + '.' + func;\n\
       const target = electron[api];\n\
       if (!target || typeof target[func] !== 'function') return false;\n\
       if (registry.mocks[key]) return true;\n\
       const state = {\n\
         original: target[func],\n\
         impl: null,\n\
         onceQueue: [],\n\
         calls: [],\n\
         results: [],\n\
         invocationCallOrder: [],\n\
       };\n\
       registry.mocks[key] = state;\n\
       const wrapper = function (...args) {\n\
         registry.order += 1;\n\
         state.invocationCallOrder.push(registry.order);\n\
         const impl = state.onceQueue.length > 0 ? state.onceQueue.shift() : state.impl;\n\
         try {\n\
           const value = impl ? impl.apply(this, args) : undefined;\n\
           state.calls.push(args);\n\
           state.results.push({ type: 'return', value: value === undefined ? null : value });\n\
           return value;\n\
         } catch (error) {\n\
           state.calls.push(args);\n\
           state.results.push({ type: 'throw', value: String(error) });\n\
           throw error;\n\
         }\n\
       };\n\
       wrapper.__isMockFunction = true;\n\
       target[func] = wrapper;\n\
       return true;\n\
     }"
}

/// Set (or queue, when `once`) the implementation from a function source.
#[must_use]
pub fn set_implementation() -> &'static str {
    "(electron, api, func, source, once) => {\n\
       const state = globalThis.__wdioMockRegistry.mocks[api + '.' + func];\n\
       if (!state) return false;\n\
       const impl = source === null ? null : eval('(' + source + ')');\n\
       if (once) { state.onceQueue.push(impl); } else { state.impl = impl; }\n\
       return true;\n\
     }"
}

/// Swap in a temporary implementation, saving the current one.
#[must_use]
pub fn begin_with_implementation() -> &'static str {
    "(electron, api, func, source) => {\n\
       const state = globalThis.__wdioMockRegistry.mocks[api + '.' + func];\n\
       if (!state) return false;\n\
       state.savedImpl = state.impl;\n\
       state.impl = eval('(' + source + ')');\n\
       return true;\n\
     }"
}

/// Restore the implementation saved by [`begin_with_implementation`].
#[must_use]
pub fn end_with_implementation() -> &'static str {
    "(electron, api, func) => {\n\
       const state = globalThis.__wdioMockRegistry.mocks[api + '.' + func];\n\
       if (!state) return false;\n\
       state.impl = state.savedImpl === undefined ? null : state.savedImpl;\n\
       delete state.savedImpl;\n\
       return true;\n\
     }"
}

/// Pull `{calls, results, invocationCallOrder}` for one mock.
#[must_use]
pub fn pull_state() -> &'static str {
    "(electron, api, func) => {\n\
       const state = globalThis.__wdioMockRegistry\n\
         && globalThis.__wdioMockRegistry.mocks[api + '.' + func];\n\
       if (!state) return null;\n\
       return {\n\
         calls: state.calls,\n\
         results: state.results,\n\
         invocationCallOrder: state.invocationCallOrder,\n\
       };\n\
     }"
}

/// Empty the recorded state, keeping the implementation.
#[must_use]
pub fn clear_mock() -> &'static str {
    "(electron, api, func) => {\n\
       const state = globalThis.__wdioMockRegistry\n\
         && globalThis.__wdioMockRegistry.mocks[api + '.' + func];\n\
       if (!state) return false;\n\
       state.calls = [];\n\
       state.results = [];\n\
       state.invocationCallOrder = [];\n\
       state.onceQueue = [];\n\
       return true;\n\
     }"
}

/// [`clear_mock`] plus dropping the implementation.
#[must_use]
pub fn reset_mock() -> &'static str {
    "(electron, api, func) => {\n\
       const state = globalThis.__wdioMockRegistry\n\
         && globalThis.__wdioMockRegistry.mocks[api + '.' + func];\n\
       if (!state) return false;\n\
       state.calls = [];\n\
       state.results = [];\n\
       state.invocationCallOrder = [];\n\
       state.onceQueue = [];\n\
       state.impl = null;\n\
       return true;\n\
     }"
}

/// [`reset_mock`] plus reinstating the original function and forgetting
/// the mock entirely.
#[must_use]
pub fn restore_mock() -> &'static str {
    "(electron, api, func) => {\n\
       const registry = globalThis.__wdioMockRegistry;\n\
       const state = registry && registry.mocks[api + '.' + func];\n\
       if (!state) return false;\n\
       electron[api][func] = state.original;\n\
       delete registry.mocks[api + '.' + func];\n\
       return true;\n\
     }"
}

/// Function source returning a constant (used by `mockReturnValue`).
#[must_use]
pub fn return_value_impl(value: &serde_json::Value) -> String {
    format!("() => ({value})")
}

/// Function source resolving a constant (used by `mockResolvedValue`).
#[must_use]
pub fn resolved_value_impl(value: &serde_json::Value) -> String {
    format!("() => Promise.resolve({value})")
}

/// Function source rejecting a constant (used by `mockRejectedValue`).
#[must_use]
pub fn rejected_value_impl(value: &serde_json::Value) -> String {
    format!("() => Promise.reject({value})")
}

/// Function source returning `this` (used by `mockReturnThis`).
#[must_use]
pub fn return_this_impl() -> &'static str {
    "function () { return this; }"
}
