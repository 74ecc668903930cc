use crate::states::record::{PersistentRecord, COUNTER_FIELD};

/// Include guard derived from the record's type name
pub fn default_guard(type_name: &str) -> String {
    let mut guard: String = type_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    guard.push_str("_H");
    guard
}

/// The companion header declaring the persistent record
pub fn render_header(record: &PersistentRecord, guard: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("#if !defined {}\n#define {}\n\n", guard, guard));
    out.push_str("#include <stdint.h>\n\n");
    out.push_str(&format!("typedef struct _{} {{\n", record.type_name));
    out.push_str(&format!("{} {};\n", record.counter.c_name(), COUNTER_FIELD));
    for field in &record.fields {
        out.push_str(&field.declaration);
        out.push('\n');
    }
    out.push_str(&format!("}} {};\n\n", record.type_name));
    out.push_str(&format!("#endif // {}\n", guard));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::record::{CounterType, RecordField};
    use crate::syntax::tree::NodeId;

    #[test]
    fn test_header_layout() {
        let record = PersistentRecord {
            type_name: "spi_plugin_state".to_string(),
            counter: CounterType::U8,
            fields: vec![RecordField {
                name: "response".to_string(),
                decl: NodeId(3),
                declaration: "uint16_t response;".to_string(),
            }],
        };
        let guard = default_guard(&record.type_name);
        assert_eq!(guard, "SPI_PLUGIN_STATE_H");
        assert_eq!(
            render_header(&record, &guard),
            "#if !defined SPI_PLUGIN_STATE_H\n\
             #define SPI_PLUGIN_STATE_H\n\
             \n\
             #include <stdint.h>\n\
             \n\
             typedef struct _spi_plugin_state {\n\
             uint8_t sa_next;\n\
             uint16_t response;\n\
             } spi_plugin_state;\n\
             \n\
             #endif // SPI_PLUGIN_STATE_H\n"
        );
    }
}
