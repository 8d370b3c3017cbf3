//! Static descriptions of the two upstream record sources.

/// Declared shape of one upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSchema {
    /// Short name used in logs and errors.
    pub name: &'static str,
    /// Natural identifier column, used to label dropped records.
    pub id_column: &'static str,
    /// Column holding the GeoJSON-like geometry.
    pub geometry_column: &'static str,
    /// Columns coerced to numbers by the dataset builder.
    pub numeric_columns: &'static [&'static str],
    /// Remaining declared attribute columns, kept as text.
    pub text_columns: &'static [&'static str],
}

impl SourceSchema {
    /// Every declared attribute column (id first, geometry excluded).
    pub fn attribute_columns(&self) -> Vec<&'static str> {
        let mut columns = vec![self.id_column];
        for column in self.text_columns.iter().chain(self.numeric_columns) {
            if *column != self.id_column {
                columns.push(*column);
            }
        }
        columns
    }

    /// Comma-separated `$select` list: declared attributes, then geometry.
    pub fn select_fields(&self) -> String {
        let mut fields = self.attribute_columns();
        fields.push(self.geometry_column);
        fields.join(",")
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_columns.contains(&column)
    }
}

pub const BUILDINGS: SourceSchema = SourceSchema {
    name: "buildings",
    id_column: "struct_id",
    geometry_column: "polygon",
    numeric_columns: &["grd_elev_min_z", "rooftop_elev_z"],
    text_columns: &[],
};

pub const ASSESSMENTS: SourceSchema = SourceSchema {
    name: "assessments",
    id_column: "roll_number",
    geometry_column: "multipolygon",
    numeric_columns: &["assessed_value", "year_of_construction"],
    text_columns: &["address", "land_use_designation"],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_fields_match_source_columns() {
        assert_eq!(
            BUILDINGS.select_fields(),
            "struct_id,grd_elev_min_z,rooftop_elev_z,polygon"
        );
        assert_eq!(
            ASSESSMENTS.select_fields(),
            "roll_number,address,land_use_designation,assessed_value,year_of_construction,multipolygon"
        );
    }
}
