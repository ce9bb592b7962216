mod helpers;
mod ingredient;
mod list;
mod recipe;
mod selection;

use crate::backend::HttpBackend;
use basket_core::service::ShoppingService;

/// The service every command runs against.
pub(crate) type Service = ShoppingService<HttpBackend>;

pub(crate) use ingredient::{
    cmd_ingredient_add, cmd_ingredient_delete, cmd_ingredient_edit, cmd_ingredient_list,
};
pub(crate) use list::{cmd_list, cmd_print, cmd_save};
pub(crate) use recipe::{
    cmd_recipe_add, cmd_recipe_delete, cmd_recipe_edit, cmd_recipe_import, cmd_recipe_list,
    cmd_recipe_remove_ingredient, cmd_recipe_set_ingredient, cmd_recipe_show,
};
pub(crate) use selection::{
    cmd_clear, cmd_deselect, cmd_manual_add, cmd_manual_remove, cmd_manual_sub, cmd_select,
    cmd_servings,
};
