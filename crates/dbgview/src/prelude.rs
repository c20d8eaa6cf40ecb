//! The Python prelude evaluated on the first response unit (§6): defines
//! `gf_typeof`, `gf_valueof`, `gf_addressof`, `gf_fields`, and `gf_locals`
//! inside the debugger's embedded interpreter. Design Notes §9: "keep
//! this as a constant string; do not attempt to regenerate or parse its
//! behavior on the host side" — `core-watch` only ever calls these five
//! functions by name, never reimplements them.

/// The full `python ... end` block, sent as a single synchronous command
/// right after the channel's first response unit.
pub const PYTHON_PRELUDE: &str = r#"python
def _gf_resolve(path):
    value = gdb.parse_and_eval(path[0])
    for key in path[1:]:
        if isinstance(key, str) and key.startswith('[') and key.endswith(']'):
            value = value[int(key[1:-1])]
        elif isinstance(key, str):
            value = value[key]
        else:
            value = value[key]
    return value

def gf_typeof(path):
    try:
        return str(_gf_resolve(path).type)
    except gdb.error:
        return "??"

def gf_valueof(path, fmt):
    try:
        value = _gf_resolve(path)
        if fmt is None or fmt == ' ':
            return value.format_string()
        return value.format_string(format=fmt)
    except gdb.error:
        return "??"

def gf_addressof(path):
    try:
        return hex(int(_gf_resolve(path).address))
    except gdb.error:
        return "??"

def gf_fields(path):
    try:
        value = _gf_resolve(path)
        target_type = value.type.strip_typedefs()
        if target_type.code == gdb.TYPE_CODE_ARRAY:
            lo, hi = target_type.range()
            return "(array) %d" % (hi - lo + 1)
        if target_type.code == gdb.TYPE_CODE_PTR:
            return "(d_arr) %d" % 0
        fields = target_type.fields()
        if fields:
            return "\n".join(f.name for f in fields if f.name)
        return "(array) 0"
    except gdb.error:
        return "??"

def gf_locals():
    try:
        frame = gdb.selected_frame()
        block = frame.block()
        names = []
        while block is not None:
            for symbol in block:
                if symbol.is_variable or symbol.is_argument:
                    names.append(symbol.name)
            if block.function is not None:
                break
            block = block.superblock
        return "\n".join(names)
    except gdb.error:
        return ""
end"#;
