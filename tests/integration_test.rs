// End-to-end tests for the blocking-to-resumable rewrite

use unblock::states::EdgeKind;
use unblock::{compile, Catalog, Compilation, Options};

fn rewrite(source: &str) -> Compilation {
    compile(source, &Catalog::builtin(), &Options::default()).expect("Compilation failed")
}

fn rewrite_with(source: &str, options: Options) -> Compilation {
    compile(source, &Catalog::builtin(), &options).expect("Compilation failed")
}

fn field_names(compilation: &Compilation) -> Vec<&str> {
    compilation
        .record
        .fields
        .iter()
        .map(|field| field.name.as_str())
        .collect()
}

#[test]
fn test_single_wait_scenario() {
    let source = "void f(h){ int x; x = 1; wait_op(h, 10); use(x); }";
    let compilation = rewrite(source);

    assert_eq!(compilation.graph.len(), 2);
    assert_eq!(field_names(&compilation), vec!["x"]);

    assert_eq!(
        compilation.source,
        "void f(h, plugin_state)\n\
         void* plugin_state;\n\
         {\n\
         f_state_t* sa_state = (f_state_t*)plugin_state;\n\
         switch (sa_state->sa_next) {\n\
         case 0: goto label_0;\n\
         case 1: goto label_1;\n\
         default: sa_state->sa_next = 0; return;\n\
         }\n\
         label_0:\n\
         sa_state->sa_next = 0;  (sa_state->x) = 1; wait_op_start(h, 10);\n\
         sa_state->sa_next = 1;\n\
         return;\n\
         label_1:\n\
         if (wait_op_pending(h)) return; use((sa_state->x)); sa_state->sa_next = 0;\n\
         }"
    );

    let counter = compilation.header.find("uint8_t sa_next;").unwrap();
    let field = compilation.header.find("int x;").unwrap();
    assert!(counter < field);
    assert!(compilation.header.starts_with("#if !defined F_STATE_T_H\n#define F_STATE_T_H\n"));
    assert!(compilation.header.contains("typedef struct _f_state_t {"));
    assert!(compilation.header.ends_with("} f_state_t;\n\n#endif // F_STATE_T_H\n"));
}

#[test]
fn test_spi_handler() {
    let source = include_str!("fixtures/spi_handler.c");
    let options = Options {
        type_name: Some("spi_plugin_state".to_string()),
        guard: Some("SPI_STATE_H".to_string()),
        ..Options::default()
    };
    let compilation = rewrite_with(source, options);
    let out = &compilation.source;

    assert_eq!(compilation.function, "spi_plugin_handler");
    assert_eq!(compilation.graph.len(), 4);
    assert_eq!(field_names(&compilation), vec!["response"]);
    assert!(compilation.diagnostics.is_empty());

    // The other functions and the preprocessor lines are untouched
    let untouched = source.find("uint8_t spi_plugin_handler(").unwrap();
    assert!(out.starts_with(&source[..untouched]));

    // The state parameter already exists
    assert!(out.contains("MEMORY_HANDLE reply, waiting_for* wf, uint8_t first_byte)\n{"));
    assert!(out.contains("spi_plugin_state* sa_state = (spi_plugin_state*)plugin_state;"));

    // `pc` is recomputed on every entry, ahead of the dispatch
    assert!(out.contains(
        "const spi_plugin_config* pc = (const spi_plugin_config*) plugin_config;\n\
         switch (sa_state->sa_next) {\n\
         case 0: goto label_0;\n\
         case 1: goto label_1;\n\
         case 2: goto label_2;\n\
         case 3: goto label_3;\n\
         default: sa_state->sa_next = 0; return PLUGIN_ERROR;\n\
         }"
    ));

    // `data` is only used before the first suspension and stays local
    assert!(out.contains("uint16_t data = papi_parser_read_encoded_uint16( command );"));
    assert!(out.contains(
        "papi_start_sending_spi_command_16(pc->spi_id, 0x0003, 0x08, data, 0x02);\n\
         papi_wait_handler_add_wait_for_spi_send(wf, pc->spi_id);\n\
         sa_state->sa_next = 1;\n\
         return PLUGIN_WAITING;\n\
         label_1:\n\
         if (papi_wait_handler_is_waiting_for_spi_send(wf, pc->spi_id)) return PLUGIN_WAITING;"
    ));

    // A primitive without a start function is replaced entirely
    assert!(!out.contains("papi_sleep"));
    assert!(out.contains(
        "papi_wait_handler_add_wait_for_timeout(wf, 1000);\n\
         sa_state->sa_next = 2;\n\
         return PLUGIN_WAITING;\n\
         label_2:\n\
         if (papi_wait_handler_is_waiting_for_timeout(0, wf)) return PLUGIN_WAITING;"
    ));

    // `response` lives across the last suspension
    assert!(out.contains("sa_state->response = 0;"));
    assert!(out.contains(
        "papi_start_receiving_spi_data_16( pc->spi_id,  0x0000, 0x08, &(sa_state->response) );\n\
         papi_wait_handler_add_wait_for_spi_receive(wf, pc->spi_id);"
    ));
    assert!(out.contains("papi_reply_write_encoded_uint16( reply, (sa_state->response) );"));
    assert!(out.contains("sa_state->sa_next = 0; return PLUGIN_OK;\n}"));

    assert_eq!(
        compilation.header,
        "#if !defined SPI_STATE_H\n\
         #define SPI_STATE_H\n\
         \n\
         #include <stdint.h>\n\
         \n\
         typedef struct _spi_plugin_state {\n\
         uint8_t sa_next;\n\
         uint16_t response;\n\
         } spi_plugin_state;\n\
         \n\
         #endif // SPI_STATE_H\n"
    );
}

#[test]
fn test_one_call_liveness() {
    let source = r#"
        void f(h) {
            int before;
            int unused;
            before = 1;
            unused = 2;
            use(unused);
            wait_op(h, 1);
            use(before);
        }
    "#;
    let compilation = rewrite(source);

    let states: Vec<u32> = compilation.graph.states().iter().map(|s| s.id).collect();
    assert_eq!(states, vec![0, 1]);
    assert_eq!(field_names(&compilation), vec!["before"]);
    assert!(compilation.source.contains("int unused;"));
}

#[test]
fn test_zero_calls() {
    let source = "int add(int a, int b) {\n    int s = a + b;\n    return s;\n}\n";
    let options = Options {
        function: Some("add".to_string()),
        ..Options::default()
    };
    let compilation = rewrite_with(source, options);

    assert_eq!(compilation.graph.len(), 1);
    assert!(compilation.graph.edges().is_empty());
    assert!(compilation.record.fields.is_empty());
    assert!(compilation.header.contains("{\nuint8_t sa_next;\n}"));

    let out = &compilation.source;
    assert!(out.starts_with("int add(int a, int b, void* plugin_state) {"));
    assert!(out.contains("int s = a + b;\nswitch (sa_state->sa_next) {\ncase 0: goto label_0;\n"));
    assert!(out.contains("sa_state->sa_next = 0; return s;"));
}

#[test]
fn test_branch_conservativeness() {
    // Assigned only in the arm without the suspension
    let source = "void f(h, c) { int x; if (c) { wait_op(h, 1); } else { x = 2; } use(x); }";
    let compilation = rewrite(source);
    assert_eq!(field_names(&compilation), vec!["x"]);

    // Assigned only in the arm with the suspension
    let source = "void f(h, c) { int x; if (c) { x = 1; wait_op(h, 1); } use(x); }";
    let compilation = rewrite(source);
    assert_eq!(field_names(&compilation), vec!["x"]);

    let edges = compilation.graph.edges();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].kind, EdgeKind::Resume);
}

#[test]
fn test_fall_through_into_later_wait() {
    let source = "void f(h, c) { if (c) { wait_op(h, 1); } wait_op(h, 2); done(); }";
    let compilation = rewrite(source);

    assert_eq!(compilation.graph.len(), 3);
    let kinds: Vec<(u32, u32, EdgeKind)> = compilation
        .graph
        .edges()
        .iter()
        .map(|edge| (edge.from, edge.to, edge.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (0, 1, EdgeKind::Resume),
            (0, 2, EdgeKind::FallThrough),
            (1, 2, EdgeKind::Resume),
        ]
    );
}

#[test]
fn test_unbraced_arms_are_wrapped() {
    let source = "int f(h, c) { if (c) wait_op(h, 1); else return 1; return 0; }";
    let compilation = rewrite(source);
    let out = &compilation.source;

    assert!(out.contains(
        "if (c) { wait_op_start(h, 1);\n\
         sa_state->sa_next = 1;\n\
         return PLUGIN_WAITING;\n\
         label_1:\n\
         if (wait_op_pending(h)) return PLUGIN_WAITING; }"
    ));
    assert!(out.contains("else { sa_state->sa_next = 0; return 1; }"));
    assert!(out.contains("sa_state->sa_next = 0; return 0; }"));
}

#[test]
fn test_prologue_and_static_locals_stay() {
    let source = "int f(h, cfg) { int n = cfg * 2; static int calls; calls++; wait_op(h, n); return n + calls; }";
    let compilation = rewrite(source);

    assert!(compilation.record.fields.is_empty());
    let out = &compilation.source;
    assert!(out.contains("int n = cfg * 2;\nswitch"));
    assert!(out.contains("static int calls; calls++;"));
    assert!(out.contains("return n + calls;"));
}

#[test]
fn test_line_markers() {
    let source = "void f(h) {\n    wait_op(h, 1);\n    done();\n}\n";
    let options = Options {
        line_markers: true,
        ..Options::default()
    };
    let out = rewrite_with(source, options).source;

    assert!(out.contains("sa_state->sa_next = 0;\n//#line 2\n"));
    assert!(out.contains("if (wait_op_pending(h)) return;\n//#line 3\n"));
}

#[test]
fn test_custom_catalog() {
    let catalog = Catalog::from_toml_str(
        r#"
            [[primitive]]
            name = "sleep_ms"
            min_args = 2
            wait_handle = 0
            start = "timer_start"
            pending = "timer_running({handle})"
        "#,
    )
    .expect("Catalog failed to load");

    let source = "int tick(timer t) { int n; n = 0; sleep_ms(t, 100); return n; }";
    let compilation = compile(source, &catalog, &Options::default()).expect("Compilation failed");

    assert_eq!(field_names(&compilation), vec!["n"]);
    assert!(compilation.source.contains("timer_start(t, 100);"));
    assert!(compilation.source.contains("if (timer_running(t)) return PLUGIN_WAITING;"));
    assert!(compile(source, &Catalog::builtin(), &Options::default()).is_err());
}

#[test]
fn test_custom_statuses_and_names() {
    let source = "int f(h) { wait_op(h, 1); return 0; }";
    let options = Options {
        type_name: Some("job_t".to_string()),
        state_param: "ctx".to_string(),
        waiting_status: "BUSY".to_string(),
        failure_status: "FAIL".to_string(),
        ..Options::default()
    };
    let compilation = rewrite_with(source, options);
    let out = &compilation.source;

    assert!(out.starts_with("int f(h, ctx)\nvoid* ctx;\n {\njob_t* sa_state = (job_t*)ctx;"));
    assert!(out.contains("return BUSY;"));
    assert!(out.contains("return FAIL;"));
    assert!(compilation.header.contains("#if !defined JOB_T_H"));
}

#[test]
fn test_void_parameter_list_is_replaced() {
    let source = "void f(void) { int h; h = open(); wait_op(h, 1); }";
    let compilation = rewrite(source);

    assert!(compilation.source.starts_with("void f(void* plugin_state) {"));
    assert_eq!(field_names(&compilation), vec!["h"]);
    assert!(compilation.source.contains("if (wait_op_pending((sa_state->h))) return;"));
}

#[test]
fn test_prototype_and_identifier_list_signatures() {
    let source = "int f(int h) { wait_op(h, 1); return 0; }";
    assert!(rewrite(source).source.starts_with("int f(int h, void* plugin_state) {"));

    let source = "int f(h, n) { wait_op(h, n); return 0; }";
    assert!(rewrite(source)
        .source
        .starts_with("int f(h, n, plugin_state)\nvoid* plugin_state;\n {"));
}

#[test]
fn test_void_handler_warns_about_status() {
    let compilation = rewrite("void f(h) { wait_op(h, 1); }");
    assert_eq!(compilation.diagnostics.len(), 1);
    assert!(compilation.diagnostics[0].message.contains("`f` returns void"));

    let compilation = rewrite("int f(h) { wait_op(h, 1); return 0; }");
    assert!(compilation.diagnostics.is_empty());
}

#[test]
fn test_values_read_on_entry_are_kept_across_suspension() {
    let source = "int g; void f(h) { int n = g; g = 5; wait_op(h, 1); use(n); }";
    let compilation = rewrite(source);
    assert_eq!(field_names(&compilation), vec!["n"]);
    assert!(compilation.source.contains("sa_state->n = g;"));
    assert!(compilation.source.contains("use((sa_state->n));"));

    let source = "void f(h, int *p) { int v = *p; *p = 9; wait_op(h, 1); use(v); }";
    let compilation = rewrite(source);
    assert_eq!(field_names(&compilation), vec!["v"]);
    assert!(compilation.source.contains("sa_state->v = *p;"));
}

#[test]
fn test_pointee_const_survives_in_record() {
    let source = "void f(h) { const char *s; const int limit = read(); s = name(); wait_op(h, 1); use(s, limit); }";
    let compilation = rewrite(source);
    let declarations: Vec<&str> = compilation
        .record
        .fields
        .iter()
        .map(|field| field.declaration.as_str())
        .collect();
    assert_eq!(declarations, vec!["const char *s;", "int limit;"]);
    assert!(compilation.source.contains("sa_state->limit = read();"));
}
