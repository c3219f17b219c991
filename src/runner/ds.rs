//! Data structures of the abstract domain: values, objects, scopes and the
//! operations over them.

pub mod array_object;
pub mod env_record;
pub mod error;
pub mod execution_context;
pub mod function_object;
pub mod heap;
pub mod object;
pub mod object_property;
pub mod value;

pub mod operations {
    pub mod object;
    pub mod test_and_comparison;
    pub mod type_conversion;
}
