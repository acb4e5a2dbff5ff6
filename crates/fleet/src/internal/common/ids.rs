use crate::define_id_type;

define_id_type!(CoreId, u32);
define_id_type!(ImplId, u32);
